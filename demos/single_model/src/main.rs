use flow_stage::{AssetDescriptor, StageConfig};

fn main() -> anyhow::Result<()> {
    let config = StageConfig {
        title: "single model".to_string(),
        ..StageConfig::single_model()
    }
    .with_asset_root("model");

    flow_stage::run(config, |registry| {
        registry.load(AssetDescriptor::new("rifa.glb").with_scale(2.0, 2.0, 2.0));
    })
}
