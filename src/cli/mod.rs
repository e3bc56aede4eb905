//! CLI subcommands: resolve, validate.

use crate::core::recipe::{self, Recipe};
use crate::core::resource::{self, Resource, StaticResource};
use crate::core::types::{Dialect, RecipeOptions, ResultSet};
use clap::{Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve a recipe against one or more resources
    Resolve {
        /// Path to the recipe (YAML or JSON)
        #[arg(short, long)]
        recipe: PathBuf,

        /// Resource file; repeat for several targets, first wins
        #[arg(short = 's', long = "resource")]
        resources: Vec<PathBuf>,

        /// Options file (dialect, startup scripts)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Use the legacy dialect
        #[arg(long)]
        legacy: bool,

        /// Startup script file, run before the recipe's own startup entry
        #[arg(long = "startup")]
        startup: Vec<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
        format: OutputFormat,
    },

    /// Check a recipe for problems without resolving it
    Validate {
        /// Path to the recipe (YAML or JSON)
        #[arg(short, long)]
        recipe: PathBuf,

        /// Use the legacy dialect
        #[arg(long)]
        legacy: bool,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Yaml,
    Json,
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands) -> Result<(), String> {
    match cmd {
        Commands::Resolve {
            recipe,
            resources,
            config,
            legacy,
            startup,
            format,
        } => cmd_resolve(&recipe, &resources, config.as_deref(), legacy, &startup, format),
        Commands::Validate { recipe, legacy } => cmd_validate(&recipe, legacy),
    }
}

/// Options from the config file (if any), with command-line overrides.
fn build_options(
    config: Option<&Path>,
    legacy: bool,
    startup: &[PathBuf],
) -> Result<RecipeOptions, String> {
    let mut options = match config {
        Some(path) => recipe::load_options(path).map_err(|e| e.to_string())?,
        None => RecipeOptions::default(),
    };
    if legacy {
        options.dialect = Dialect::Legacy;
    }
    for path in startup {
        let script = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read startup script {}: {}", path.display(), e))?;
        options.startup_scripts.push(script);
    }
    Ok(options)
}

fn resolve_files(
    recipe_path: &Path,
    resource_paths: &[PathBuf],
    options: &RecipeOptions,
) -> Result<ResultSet, String> {
    let recipe = recipe::load_recipe(recipe_path).map_err(|e| e.to_string())?;
    let loaded: Vec<StaticResource> = resource_paths
        .iter()
        .map(|path| resource::load_resource(path).map_err(|e| e.to_string()))
        .collect::<Result<_, _>>()?;
    let targets: Vec<&dyn Resource> = loaded.iter().map(|r| r as &dyn Resource).collect();
    Ok(Recipe::resolve(&targets, &recipe, options).into_results())
}

fn render(results: &ResultSet, format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Yaml => {
            serde_yaml_ng::to_string(results).map_err(|e| format!("YAML encode error: {}", e))
        }
        OutputFormat::Json => serde_json::to_string_pretty(results)
            .map(|mut s| {
                s.push('\n');
                s
            })
            .map_err(|e| format!("JSON encode error: {}", e)),
    }
}

fn cmd_resolve(
    recipe_path: &Path,
    resource_paths: &[PathBuf],
    config: Option<&Path>,
    legacy: bool,
    startup: &[PathBuf],
    format: OutputFormat,
) -> Result<(), String> {
    let options = build_options(config, legacy, startup)?;
    let results = resolve_files(recipe_path, resource_paths, &options)?;
    print!("{}", render(&results, format)?);
    Ok(())
}

fn cmd_validate(recipe_path: &Path, legacy: bool) -> Result<(), String> {
    let recipe = recipe::load_recipe(recipe_path).map_err(|e| e.to_string())?;
    let options = RecipeOptions::new(Dialect::from_legacy_flag(legacy));
    let errors = recipe::validate_recipe(&recipe, &options);

    if errors.is_empty() {
        let entries = recipe
            .keys()
            .filter(|k| k.as_str() != Some(recipe::STARTUP_KEY))
            .count();
        println!(
            "OK: {} ({} entries, {} dialect)",
            recipe_path.display(),
            entries,
            options.dialect
        );
        Ok(())
    } else {
        for e in &errors {
            eprintln!("  ERROR: {}", e);
        }
        Err(format!("{} validation error(s)", errors.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_yaml_ng::Value;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    const RESOURCE: &str = r#"
name: scan
groups:
  method:
    PVM_EchoTime: 3.5
    PVM_SpatResol: [0.1, 0.2]
  acqp:
    NR: 4
"#;

    #[test]
    fn test_cli_resolve_files() {
        let dir = tempfile::tempdir().unwrap();
        let recipe = write(
            dir.path(),
            "recipe.yaml",
            "te: method.PVM_EchoTime\nmissing: method.nope\nres_y: {key: method.PVM_SpatResol, idx: 1}\n",
        );
        let res = write(dir.path(), "scan.yaml", RESOURCE);
        let results = resolve_files(&recipe, &[res], &RecipeOptions::default()).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results["te"], Value::from(3.5));
        assert_eq!(results["res_y"], Value::from(0.2));
    }

    #[test]
    fn test_cli_resolve_missing_resource_file() {
        let dir = tempfile::tempdir().unwrap();
        let recipe = write(dir.path(), "recipe.yaml", "a: 1\n");
        let err = resolve_files(
            &recipe,
            &[dir.path().join("nope.yaml")],
            &RecipeOptions::default(),
        )
        .unwrap_err();
        assert!(err.contains("nope.yaml"));
    }

    #[test]
    fn test_cli_options_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let config = write(
            dir.path(),
            "options.yaml",
            "dialect: current\nstartup_scripts: ['a = 1']\n",
        );
        let script = write(dir.path(), "helpers.py", "def f(x): return x + a\n");
        let options = build_options(Some(&config), true, &[script]).unwrap();
        assert_eq!(options.dialect, Dialect::Legacy);
        assert_eq!(options.startup_scripts.len(), 2);
        assert_eq!(options.startup_scripts[0], "a = 1");
    }

    #[test]
    fn test_cli_startup_script_used() {
        let dir = tempfile::tempdir().unwrap();
        let recipe = write(dir.path(), "recipe.yaml", "n2: {script: f(n), n: acqp.NR}\n");
        let res = write(dir.path(), "scan.yaml", RESOURCE);
        let script = write(dir.path(), "helpers.txt", "def f(x): return x * 10\n");
        let options = build_options(None, false, &[script]).unwrap();
        let results = resolve_files(&recipe, &[res], &options).unwrap();
        assert_eq!(results["n2"], Value::from(40));
    }

    #[test]
    fn test_cli_render_formats() {
        let mut results = ResultSet::new();
        results.insert("a".to_string(), Value::from(5));
        assert_eq!(render(&results, OutputFormat::Yaml).unwrap(), "a: 5\n");
        let json = render(&results, OutputFormat::Json).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["a"], 5);
    }

    #[test]
    fn test_cli_validate_ok_and_errors() {
        let dir = tempfile::tempdir().unwrap();
        let good = write(dir.path(), "good.yaml", "a: g.x\nb: {script: x, x: 1}\n");
        assert!(cmd_validate(&good, false).is_ok());
        let bad = write(dir.path(), "bad.yaml", "a: {key: g.x}\nb: {script: '('}\n");
        let err = cmd_validate(&bad, false).unwrap_err();
        assert_eq!(err, "2 validation error(s)");
    }

    #[test]
    fn test_cli_validate_rejects_non_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let list = write(dir.path(), "list.yaml", "- a\n");
        assert!(cmd_validate(&list, false).is_err());
    }
}
