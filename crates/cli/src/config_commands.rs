use anyhow::Result;

use msghub_config::MsghubConfig;

pub fn print(config: &MsghubConfig, json: bool) -> Result<()> {
    let rendered = if json {
        serde_json::to_string_pretty(config)?
    } else {
        toml::to_string_pretty(config)?
    };
    println!("{rendered}");
    Ok(())
}
