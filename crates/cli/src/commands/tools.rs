//! `toolpilot tools`: List the tools the model can call.

use super::GlobalArgs;

pub fn run(globals: &GlobalArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(globals)?;
    let registry = super::build_registry(&config)?;

    println!("Workspace: {}", config.workspace_root().display());
    println!();
    for name in registry.names() {
        let spec = registry.lookup(name)?;
        println!("  {name}");
        println!("      {}", spec.description);
        for param in spec.input_schema.params() {
            let marker = if param.required { "" } else { "?" };
            println!(
                "      - {}{marker}: {:?} — {}",
                param.name, param.kind, param.description
            );
        }
        println!();
    }
    Ok(())
}
