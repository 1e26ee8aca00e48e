use std::collections::HashMap;

use fog_core::{
    AgentId, DebugSphere, Event, GridBuffer, GridCoord, GridSize, PositionResolver, ResolveError,
    Rgba, TrackedAgent, WorldToGrid, DEBUG_SPHERE_SEGMENTS, HIDDEN, VISIBLE,
};
use fog_system_visibility::VisibilityWriter;
use glam::{IVec2, Vec3};

/// Scene where world units map one-to-one onto grid cells.
#[derive(Default)]
struct UnitScene {
    positions: HashMap<AgentId, Vec3>,
}

impl UnitScene {
    fn place(&mut self, agent: AgentId, column: f32, row: f32) {
        let _ = self.positions.insert(agent, Vec3::new(column, row, 0.0));
    }
}

impl PositionResolver for UnitScene {
    fn world_position(&self, agent: AgentId) -> Result<Vec3, ResolveError> {
        self.positions
            .get(&agent)
            .copied()
            .ok_or(ResolveError::AgentDestroyed(agent))
    }
}

struct FloorTransform;

impl WorldToGrid for FloorTransform {
    fn world_to_grid(&self, position: Vec3, _grid: GridSize) -> IVec2 {
        IVec2::new(position.x.floor() as i32, position.y.floor() as i32)
    }
}

fn agent(id: u32) -> TrackedAgent {
    TrackedAgent::new(AgentId::new(id), 3.0)
}

fn run(
    writer: &VisibilityWriter,
    agents: &[TrackedAgent],
    scene: &UnitScene,
    buffer: &mut GridBuffer,
) -> (Vec<Event>, Vec<DebugSphere>) {
    let mut events = Vec::new();
    let mut debug = Vec::new();
    writer.handle(
        agents,
        scene,
        &FloorTransform,
        buffer,
        &mut events,
        &mut debug,
    );
    (events, debug)
}

#[test]
fn single_agent_marks_exactly_one_cell() {
    let mut buffer = GridBuffer::new(GridSize::square(4)).expect("allocate");
    let mut scene = UnitScene::default();
    scene.place(AgentId::new(1), 2.5, 1.25);

    let (events, debug) = run(&VisibilityWriter::new(), &[agent(1)], &scene, &mut buffer);

    for (index, byte) in buffer.as_bytes().iter().enumerate() {
        let expected = if index == 6 { VISIBLE } else { HIDDEN };
        assert_eq!(*byte, expected, "byte {index}");
    }
    assert_eq!(
        events,
        vec![Event::CellStamped {
            agent: AgentId::new(1),
            cell: GridCoord::new(2, 1),
        }]
    );
    assert!(debug.is_empty(), "debug output is disabled by default");
}

#[test]
fn agents_sharing_a_cell_produce_a_single_mark() {
    let mut buffer = GridBuffer::new(GridSize::square(4)).expect("allocate");
    let mut scene = UnitScene::default();
    scene.place(AgentId::new(1), 1.1, 1.9);
    scene.place(AgentId::new(2), 1.7, 1.2);

    let (events, _) = run(
        &VisibilityWriter::new(),
        &[agent(1), agent(2)],
        &scene,
        &mut buffer,
    );

    let marked: Vec<usize> = buffer
        .as_bytes()
        .iter()
        .enumerate()
        .filter(|(_, byte)| **byte != HIDDEN)
        .map(|(index, _)| index)
        .collect();
    assert_eq!(marked, vec![5]);
    assert_eq!(buffer.as_bytes()[5], VISIBLE);
    assert_eq!(events.len(), 2, "each agent reports its own stamp");
}

#[test]
fn destroyed_agents_are_skipped_without_stamping() {
    let mut buffer = GridBuffer::new(GridSize::square(4)).expect("allocate");
    let mut scene = UnitScene::default();
    scene.place(AgentId::new(2), 3.0, 3.0);

    let (events, _) = run(
        &VisibilityWriter::new(),
        &[agent(1), agent(2)],
        &scene,
        &mut buffer,
    );

    assert_eq!(
        events,
        vec![
            Event::AgentSkipped {
                agent: AgentId::new(1),
                reason: ResolveError::AgentDestroyed(AgentId::new(1)),
            },
            Event::CellStamped {
                agent: AgentId::new(2),
                cell: GridCoord::new(3, 3),
            },
        ]
    );
    assert_eq!(
        buffer.as_bytes().iter().filter(|byte| **byte == VISIBLE).count(),
        1
    );
}

#[test]
fn writer_does_not_clear_previous_marks() {
    let mut buffer = GridBuffer::new(GridSize::square(4)).expect("allocate");
    buffer.write(GridCoord::new(0, 0), VISIBLE);
    let mut scene = UnitScene::default();
    scene.place(AgentId::new(1), 3.0, 0.0);

    let _ = run(&VisibilityWriter::new(), &[agent(1)], &scene, &mut buffer);

    assert_eq!(buffer.get(GridCoord::new(0, 0)), VISIBLE);
    assert_eq!(buffer.get(GridCoord::new(3, 0)), VISIBLE);
}

#[test]
fn debug_spheres_follow_resolved_agents() {
    let mut buffer = GridBuffer::new(GridSize::square(4)).expect("allocate");
    let mut scene = UnitScene::default();
    scene.place(AgentId::new(4), 0.5, 0.5);
    let color = Rgba::new(0, 0xFF, 0, 0x80);

    let (_, debug) = run(
        &VisibilityWriter::with_debug_agents(color),
        &[agent(4), agent(5)],
        &scene,
        &mut buffer,
    );

    assert_eq!(
        debug,
        vec![DebugSphere {
            agent: AgentId::new(4),
            center: Vec3::new(0.5, 0.5, 0.0),
            radius: 3.0,
            color,
            segments: DEBUG_SPHERE_SEGMENTS,
        }]
    );
}

#[test]
#[should_panic(expected = "outside the 4x4 layer")]
fn projection_outside_the_grid_is_fatal() {
    let mut buffer = GridBuffer::new(GridSize::square(4)).expect("allocate");
    let mut scene = UnitScene::default();
    scene.place(AgentId::new(1), 4.0, 0.0);

    let _ = run(&VisibilityWriter::new(), &[agent(1)], &scene, &mut buffer);
}

#[test]
#[should_panic(expected = "outside the 4x4 layer")]
fn negative_projection_is_fatal() {
    let mut buffer = GridBuffer::new(GridSize::square(4)).expect("allocate");
    let mut scene = UnitScene::default();
    scene.place(AgentId::new(1), -0.5, 2.0);

    let _ = run(&VisibilityWriter::new(), &[agent(1)], &scene, &mut buffer);
}
