use ray_transmission::{flow, screen::ScreenConfig};

fn main() -> anyhow::Result<()> {
    flow::run(ScreenConfig::default())
}
