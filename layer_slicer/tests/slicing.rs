use common::config::SliceMode;
use layer_slicer::{
    error::ErrorKind,
    mesh::Mesh,
    slicer::{SliceStatus, Slicer, TaskPoll},
    Pos,
};

fn unit_cube() -> Mesh {
    Mesh::cube(Pos::zeros(), Pos::repeat(1.0))
}

#[test]
fn cube_volume_slabs() {
    let slicer = Slicer::new();
    let slices = slicer
        .slice_blocking(&unit_cube(), 0.25, SliceMode::Volumetric)
        .unwrap();

    assert_eq!(slices.len(), 4);
    let areas = slices.iter().map(|x| x.area()).collect::<Vec<_>>();
    // Side walls in every slab, plus the bottom and top caps.
    for (area, expected) in areas.iter().zip([2.0, 1.0, 1.0, 2.0]) {
        assert!((area - expected).abs() < 1e-5, "{areas:?}");
    }

    for slice in slices.iter() {
        assert!(slice.triangle_count() > 0);
        assert!(slice
            .triangles()
            .flatten()
            .all(|p| p.z >= slice.z0 && p.z <= slice.z1));
    }
}

#[test]
fn cube_contours() {
    let slicer = Slicer::new();
    let slices = slicer
        .slice_blocking(&unit_cube(), 0.25, SliceMode::Contour)
        .unwrap();

    assert_eq!(slices.len(), 4);
    // The first plane lies in the bottom face, which touches but doesn't
    // cross it.
    assert!(slices.get(0).unwrap().is_empty());

    for slice in slices.iter().skip(1) {
        let mut loops = slice.contour_loops();
        assert_eq!(loops.len(), 1);
        assert!(loops[0].closed);

        loops[0].simplify(1e-5);
        let mut corners = loops[0]
            .points
            .iter()
            .map(|p| (p.x.round() as i32, p.y.round() as i32))
            .collect::<Vec<_>>();
        corners.sort();
        assert_eq!(corners, [(0, 0), (0, 1), (1, 0), (1, 1)]);
        assert!(loops[0].points.iter().all(|p| p.z == slice.z0));
    }
}

#[test]
fn deterministic() {
    let mut mesh = unit_cube();
    mesh.set_rotation(Pos::new(0.3, 0.7, 0.1));
    mesh.set_scale(Pos::new(3.0, 1.5, 2.0));

    for mode in [SliceMode::Contour, SliceMode::Volumetric] {
        let a = Slicer::new().slice_blocking(&mesh, 0.13, mode).unwrap();
        let b = Slicer::new().slice_blocking(&mesh, 0.13, mode).unwrap();

        assert_eq!(a.len(), b.len());
        for (a, b) in a.iter().zip(b.iter()) {
            assert_eq!(a, b);
        }
    }
}

#[test]
fn layer_count_matches_extent() {
    let mut mesh = unit_cube();
    mesh.set_scale(Pos::new(1.0, 1.0, 3.3));

    let slicer = Slicer::new();
    let task = slicer.slice_model(&mesh, 0.5, SliceMode::Volumetric).unwrap();
    let (min, max) = mesh.bounds();
    assert_eq!(task.total_layers(), ((max.z - min.z) / 0.5).ceil() as u32);
    assert_eq!(task.total_layers(), 7);
}

#[test]
fn restart_starts_from_zero() {
    let slicer = Slicer::new();
    let mut first = slicer
        .slice_model(&unit_cube(), 0.25, SliceMode::Volumetric)
        .unwrap();
    assert_eq!(first.step(), TaskPoll::Pending);
    assert_eq!(first.step(), TaskPoll::Pending);

    let mut second = slicer
        .slice_model(&unit_cube(), 0.25, SliceMode::Volumetric)
        .unwrap();
    let state = slicer.progress();
    assert_eq!((state.status, state.current_layer), (SliceStatus::Running, 0));

    assert_eq!(first.step(), TaskPoll::Stale);
    assert_eq!(second.step(), TaskPoll::Pending);
    assert_eq!(slicer.slices().get(0).unwrap().layer, 0);
    assert_eq!(slicer.slices().len(), 1);
}

#[test]
fn setup_errors_are_structured() {
    let slicer = Slicer::new();

    let err = slicer
        .slice_model(&Mesh::default(), 0.1, SliceMode::Contour)
        .err()
        .unwrap();
    assert_eq!(err.kind(), ErrorKind::InvalidParameter);

    let err = slicer
        .slice_model(&unit_cube(), -1.0, SliceMode::Contour)
        .err()
        .unwrap();
    assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    assert!(err.to_string().contains("layer height"));

    let state = slicer.progress();
    assert_eq!(state.status, SliceStatus::Error);
    assert_eq!(state.current_layer, 0);
    assert!(slicer.slices().is_empty());
}

#[test]
fn buffers_without_indices() {
    // Two triangles of a tent, read as sequential triples.
    #[rustfmt::skip]
    let positions = [
        0.0, 0.0, 0.0,  1.0, 0.0, 0.0,  0.5, 0.0, 1.0,
        0.0, 1.0, 0.0,  1.0, 1.0, 0.0,  0.5, 1.0, 1.0,
    ];
    let mesh = Mesh::from_buffers(&positions, None).unwrap();

    let slices = Slicer::new()
        .slice_blocking(&mesh, 0.5, SliceMode::Contour)
        .unwrap();
    assert_eq!(slices.len(), 2);
    assert_eq!(slices.get(1).unwrap().segment_count(), 2);
}
