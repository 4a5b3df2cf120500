use crate::env::Env;
use crate::output::print_json;
use anyhow::Context;
use fourdx_core::workspace;

pub fn run(env: &Env, title: Option<&str>) -> anyhow::Result<()> {
    let report = workspace::init(env.root(), title)
        .with_context(|| format!("failed to initialize {}", env.root().display()))?;

    if env.json {
        return print_json(&serde_json::json!({
            "root": env.root(),
            "config_created": report.config_created,
            "config_path": report.config_path,
            "db_path": report.db_path,
        }));
    }

    println!("Initializing fourdx in: {}", env.root().display());
    if report.config_created {
        println!("  created: .fourdx/config.yaml");
    } else {
        println!("  exists:  .fourdx/config.yaml");
    }
    println!("  ready:   .fourdx/fourdx.db");
    println!();
    println!("Next: fourdx member add --name <NAME> --email <EMAIL>");
    Ok(())
}
