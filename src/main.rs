use clap::{Parser, ValueEnum};
use erdts::GenerationScope;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ScopeSelection {
    Entities,
    Models,
    Both,
}

#[derive(Debug, Parser)]
#[command(name = "erdts")]
#[command(version, about = "Compile an entity/relationship schema to TypeScript declarations")]
struct Args {
    /// Schema source file
    input: PathBuf,

    /// Output directory; scope and enum directories are created below it
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Which scopes to generate
    #[arg(short, long, value_enum, default_value_t = ScopeSelection::Both)]
    scope: ScopeSelection,

    /// Nesting depth of the models scope
    #[arg(short = 'd', long, default_value_t = erdts::scope::DEFAULT_MAX_DEPTH)]
    max_depth: u32,

    /// Relations expanded in the entities scope (`Entity.relation` or `relation`)
    #[arg(short, long = "allow", value_delimiter = ',')]
    allow: Vec<String>,

    /// Print files to stdout instead of writing them
    #[arg(long, default_value_t = false)]
    stdout: bool,
}

impl Args {
    fn scopes(&self) -> Vec<GenerationScope> {
        let mut scopes = Vec::new();
        if self.scope != ScopeSelection::Models {
            scopes.push(GenerationScope::entities(self.allow.iter().cloned()));
        }
        if self.scope != ScopeSelection::Entities {
            scopes.push(GenerationScope::models(self.max_depth));
        }
        scopes
    }
}

fn write_files(root: &Path, files: &[(String, String)]) -> std::io::Result<()> {
    for (path, contents) in files {
        let target = root.join(path);
        if let Some(dir) = target.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&target, contents)?;
        tracing::debug!(path = %target.display(), "wrote file");
    }
    Ok(())
}

fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("erdts=info")),
        )
        .init();

    let input = match fs::read_to_string(&args.input) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to read {}: {}", args.input.display(), e);
            process::exit(1);
        }
    };

    let generated = match erdts::compile(&input, &args.scopes()) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };
    let files = generated.files();

    if args.stdout {
        for (path, contents) in &files {
            println!("// {}", path);
            print!("{}", contents);
        }
        return;
    }

    if let Err(e) = write_files(&args.output, &files) {
        eprintln!("Failed to write output: {}", e);
        process::exit(1);
    }
    tracing::info!(files = files.len(), output = %args.output.display(), "done");
}
