use flow_stage::{AssetDescriptor, Euler, StageConfig};

fn main() -> anyhow::Result<()> {
    let config = StageConfig {
        title: "showcase".to_string(),
        ..Default::default()
    }
    .with_asset_root("model");

    flow_stage::run(config, |registry| {
        registry.request_load(AssetDescriptor::new("coca.glb"), |_, _| {
            log::info!("Coca model loaded with rotation");
        });
        // angles are radians, so these are not half and quarter turns
        registry.request_load(
            AssetDescriptor::new("cj2.glb")
                .with_position(5.0, 1.5, 0.0)
                .with_scale(0.08, 0.08, 0.08)
                .with_rotation(Euler::new(0.0, 180.0, 0.0)),
            |_, _| log::info!("Pepsi model loaded with rotation"),
        );
        registry.request_load(
            AssetDescriptor::new("rifa.glb")
                .with_position(-5.0, 1.5, 0.0)
                .with_scale(2.0, 2.0, 2.0)
                .with_rotation(Euler::new(0.0, 90.0, 0.0)),
            |_, _| log::info!("Rifa model loaded with rotation"),
        );
    })
}
