use flow_stage::{
    config::{StageConfig, hex_colour},
    helpers::{AxesHelper, GridHelper},
};

use crate::common::test_utils::assert_close;

mod common;

#[test]
fn grid_has_two_lines_per_division_boundary() {
    let grid = GridHelper::new(12.0, 12);
    let vertices = grid.vertices();
    assert_eq!(vertices.len(), 13 * 4);

    for v in &vertices {
        assert_eq!(v.position[1], 0.0);
        assert!(v.position[0].abs() <= 6.0 && v.position[2].abs() <= 6.0);
    }

    let centre = hex_colour(0x444444);
    let centre_lines = vertices.iter().filter(|v| v.colour == centre).count();
    // one line along each axis through the origin
    assert_eq!(centre_lines, 4);
    assert!(
        vertices
            .iter()
            .filter(|v| v.colour == centre)
            .all(|v| v.position[0] == 0.0 || v.position[2] == 0.0)
    );
}

#[test]
fn axes_point_along_x_y_and_z() {
    let vertices = AxesHelper::new(4.0).vertices();
    assert_eq!(vertices.len(), 6);
    assert_eq!(vertices[1].position, [4.0, 0.0, 0.0]);
    assert_eq!(vertices[3].position, [0.0, 4.0, 0.0]);
    assert_eq!(vertices[5].position, [0.0, 0.0, 4.0]);
    assert_eq!(vertices[0].colour, [1.0, 0.0, 0.0]);
    assert_eq!(vertices[2].colour, [0.0, 1.0, 0.0]);
    assert_eq!(vertices[4].colour, [0.0, 0.0, 1.0]);
}

#[test]
fn hex_colours_are_linearised() {
    assert_eq!(hex_colour(0xFFFFFF), [1.0, 1.0, 1.0]);
    assert_eq!(hex_colour(0x000000), [0.0, 0.0, 0.0]);
    // sRGB 0x40 is roughly 5 % linear
    assert_close(hex_colour(0x404040)[0], 0.0512695);
}

#[test]
fn presets_differ_only_in_the_camera() {
    let showcase = StageConfig::default();
    let single = StageConfig::single_model();
    assert_eq!(showcase.camera.position, [-20.0, 18.0, -20.0]);
    assert_eq!(single.camera.position, [6.0, 8.0, 14.0]);
    assert_eq!(showcase.ambient, single.ambient);
    assert_eq!(showcase.point_light, single.point_light);
    assert_eq!(showcase.grid, Some(GridHelper::new(12.0, 12)));
    assert_eq!(showcase.axes, Some(AxesHelper::new(4.0)));
    assert_eq!(showcase.asset_root, "assets");
    assert_eq!(
        StageConfig::default().with_asset_root("public/models").asset_root,
        "public/models"
    );
}
