use crate::params::ctype::CFieldType;
use crate::params::error::CodegenError;
use crate::params::schema::ParamsType;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct CSupportGeneratorOptions {
    pub output_dir: PathBuf,
}

/// Writes the generated C support code of params types to header files,
/// one header per named definition.
pub struct CSupportGenerator {
    options: CSupportGeneratorOptions,
}

impl CSupportGenerator {
    pub fn new(options: CSupportGeneratorOptions) -> Self {
        Self { options }
    }

    /// Full support code of one params type: host runtime prelude, the
    /// deduplicated field-type fragments, then the struct definition.
    pub fn render(params: &ParamsType) -> String {
        params.c_support_code().join("\n")
    }

    pub fn emit_code(&self, schemas: &[(String, ParamsType)]) -> Result<Vec<PathBuf>, CodegenError> {
        create_dir(&self.options.output_dir)?;

        let mut written = Vec::with_capacity(schemas.len());
        for (def_name, params) in schemas {
            let mut content = String::from("#pragma once\n\n");
            content.push_str(&Self::render(params));
            let path = self.options.output_dir.join(format!("{def_name}.h"));
            fs::write(&path, &content).map_err(|source| CodegenError::Io {
                path: path.display().to_string(),
                source,
            })?;
            debug!(def = %def_name, struct_name = %params.name(), path = %path.display(), "wrote params header");
            written.push(path);
        }
        Ok(written)
    }
}

fn create_dir(dir: &Path) -> Result<(), CodegenError> {
    fs::create_dir_all(dir).map_err(|source| CodegenError::Io {
        path: dir.display().to_string(),
        source,
    })
}
