//! Project scaffolding
//!
//! `scriptserve init` lays out a minimal project in the current
//! directory: a document root with an index page, a scripts directory
//! with an example handler, and an `etc/config.sh` that exports the
//! matching `SCRIPTSERVE_*` environment. Existing files are left alone,
//! so re-running init on a project never clobbers work.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use argh::FromArgs;

/// Arguments for scaffolding a new project.
#[derive(FromArgs)]
#[argh(subcommand, name = "init")]
/// create a basic project layout in the current directory
pub struct InitArgs {
    /// project name used in the generated pages
    #[argh(option, default = "\"My Project\".to_string()")]
    name: String,

    /// hostname written to the generated configuration
    #[argh(option, default = "\"localhost\".to_string()")]
    host: String,

    /// port written to the generated configuration
    #[argh(option, short = 'p', default = "8000")]
    port: u16,

    /// document root to create
    #[argh(option, short = 'd', default = "\"static\".to_string()")]
    docroot: String,

    /// scripts directory to create
    #[argh(option, short = 's', default = "\"scripts\".to_string()")]
    scripts: String,

    /// configuration directory to create
    #[argh(option, default = "\"etc\".to_string()")]
    config: String,
}

pub fn run(args: InitArgs) -> Result<()> {
    let cwd = std::env::current_dir().context("cannot determine current directory")?;
    run_in(&cwd, &args)
}

fn run_in(root: &Path, args: &InitArgs) -> Result<()> {
    let docroot = root.join(&args.docroot);
    let scripts = root.join(&args.scripts);
    let config = root.join(&args.config);

    for dir in [&docroot, &scripts, &config] {
        println!("Creating {}", dir.display());
        fs::create_dir_all(dir).with_context(|| format!("cannot create {}", dir.display()))?;
    }

    write_new(&root.join("README.md"), &readme(&args.name))?;
    write_new(&docroot.join("index.html"), &index_html(&args.name))?;
    write_new(&scripts.join("test.js"), TEST_SCRIPT)?;
    write_new(&config.join("config.sh"), &config_sh(args))?;

    println!("Setup completed.");
    Ok(())
}

/// Writes a scaffold file unless it already exists.
fn write_new(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        println!("Keeping existing {}", path.display());
        return Ok(());
    }
    println!("Creating {}", path.display());
    fs::write(path, content).with_context(|| format!("cannot write {}", path.display()))
}

fn readme(name: &str) -> String {
    format!("# {name}\n\nServed with scriptserve.\n")
}

fn index_html(name: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n    <head>\n        <title>{name}</title>\n    </head>\n    <body>\n        <h1>{name}</h1>\n    </body>\n</html>\n"
    )
}

const TEST_SCRIPT: &str = r#"/**
 * test.js - an example route handler
 */
(function (req, res) {
    res.setHeader("Content-Type", "text/plain");
    res.setContent("Hello World!");
}(Request, Response));
"#;

fn config_sh(args: &InitArgs) -> String {
    format!(
        "#!/bin/bash\n# {} configuration\n# Source this file before running scriptserve\n\nexport SCRIPTSERVE_HOST={:?}\nexport SCRIPTSERVE_PORT={:?}\nexport SCRIPTSERVE_DOCROOT={:?}\nexport SCRIPTSERVE_SCRIPTS={:?}\n",
        args.name,
        args.host,
        args.port.to_string(),
        args.docroot,
        args.scripts,
    )
}
