/* Codegen command - generate C support code from params definitions */

use anyhow::Context;
use params_gen::codegen::c::{CSupportGenerator, CSupportGeneratorOptions};
use params_gen::defs::ParamsFile;
use params_gen::params::schema::ParamsType;
use std::fs;
use std::path::PathBuf;

/* Execute the codegen command */
pub fn run(files: Vec<PathBuf>, output_dir: PathBuf, verbose: bool) -> anyhow::Result<()> {
    if verbose {
        println!("Params Generator - Code Generation");
        println!("==================================\n");
        println!("[~] Configuration:");
        println!("  Output directory: {}", output_dir.display());
        println!("  Input files: {}", files.len());
        for file in &files {
            println!("    - {}", file.display());
        }
        println!();
    }

    let schemas = load_definitions(&files, verbose)?;

    let generator = CSupportGenerator::new(CSupportGeneratorOptions {
        output_dir: output_dir.clone(),
    });
    let written = generator.emit_code(&schemas)?;

    println!(
        "[✓] Generated {} header(s) in {}",
        written.len(),
        output_dir.display()
    );
    Ok(())
}

pub(crate) fn load_definitions(
    files: &[PathBuf],
    verbose: bool,
) -> anyhow::Result<Vec<(String, ParamsType)>> {
    let mut schemas = Vec::new();
    for file in files {
        let text = fs::read_to_string(file)
            .with_context(|| format!("failed to read {}", file.display()))?;
        let parsed: ParamsFile = serde_yml::from_str(&text)
            .with_context(|| format!("failed to parse {}", file.display()))?;
        for def in &parsed.params {
            let params = def
                .build()
                .with_context(|| format!("invalid params definition '{}'", def.name))?;
            if verbose {
                println!("[~] {} -> struct {}", def.name, params.name());
            }
            schemas.push((def.name.clone(), params));
        }
    }
    Ok(schemas)
}
