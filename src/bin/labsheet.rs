use anyhow::Context;
use clap::Parser;
use clap::Subcommand;
use labsheet::inspect;
use labsheet::DuckDbStore;
use labsheet::ImportTemplate;
use labsheet::ProjectId;
use labsheet::ProjectRepository;
use std::path::Path;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "labsheet")]
#[command(about = "Import laboratory project workbooks into DuckDB and export them back onto a template")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the detected header row of every sheet and compare templates
    Inspect {
        /// Workbooks to inspect
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Parse a workbook and print its records as JSON
    Parse {
        file: PathBuf,

        /// Built-in import template: `sg866` or `generic` (every sheet,
        /// header at the first non-empty row)
        #[arg(long, default_value = "sg866")]
        import_template: String,
    },

    /// Parse a workbook and store it as a project, replacing any previous import
    Import {
        #[arg(long, env = "LABSHEET_DATABASE")]
        database: PathBuf,

        #[arg(long)]
        project: ProjectId,

        file: PathBuf,

        /// Built-in import template: `sg866` or `generic` (every sheet,
        /// header at the first non-empty row)
        #[arg(long, default_value = "sg866")]
        import_template: String,
    },

    /// Rebuild a project's workbook on top of the base template
    Export {
        #[arg(long, env = "LABSHEET_DATABASE")]
        database: PathBuf,

        #[arg(long)]
        project: ProjectId,

        /// Base template workbook
        #[arg(long, env = "LABSHEET_TEMPLATE")]
        template: PathBuf,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Delete a project with all its sheets and rows
    Delete {
        #[arg(long, env = "LABSHEET_DATABASE")]
        database: PathBuf,

        #[arg(long)]
        project: ProjectId,
    },

    /// List stored projects
    Projects {
        #[arg(long, env = "LABSHEET_DATABASE")]
        database: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Inspect { files } => {
            let mut reports = Vec::with_capacity(files.len());
            for file in &files {
                let report = inspect::inspect_file(file)
                    .with_context(|| format!("Failed to inspect {}", file.display()))?;
                println!("FILE: {}", file.display());
                for sheet in &report {
                    println!(
                        "  - {}: header_row={}, headers={:?}",
                        sheet.name,
                        sheet.header_row.map(|row| row.to_string()).unwrap_or_else(|| "none".to_owned()),
                        sheet.header_values
                    );
                }
                reports.push(report);
            }
            println!("MAPPING_CONSISTENT={}", inspect::mapping_consistent(&reports));
        }
        Commands::Parse { file, import_template } => {
            let parsed = labsheet::import::parse_file(&file, &template(&import_template)?)
                .with_context(|| format!("Failed to parse {}", file.display()))?;
            println!("{}", serde_json::to_string_pretty(&parsed)?);
        }
        Commands::Import { database, project, file, import_template } => {
            let selected = template(&import_template)?;
            let mut store = open_store(&database)?;
            let parsed = labsheet::import_file(&mut store, project, &file, &selected)
                .with_context(|| format!("Failed to import {} as project {project}", file.display()))?;
            let rows = parsed.sheets.iter().map(|sheet| sheet.records.len()).sum::<usize>();
            println!("Imported project {project}: {} sheets, {rows} rows", parsed.sheets.len());
        }
        Commands::Export { database, project, template, output } => {
            let mut store = open_store(&database)?;
            let base = std::fs::read(&template)
                .with_context(|| format!("Failed to read template {}", template.display()))?;
            let bytes = labsheet::reconstruct(&mut store, project, &base)
                .with_context(|| format!("Failed to export project {project}"))?;
            std::fs::write(&output, bytes)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!("Exported project {project} to {}", output.display());
        }
        Commands::Delete { database, project } => {
            let mut store = open_store(&database)?;
            store
                .delete_project(project)
                .with_context(|| format!("Failed to delete project {project}"))?;
            println!("Deleted project {project}");
        }
        Commands::Projects { database } => {
            let store = open_store(&database)?;
            for project in store.list_projects()? {
                println!(
                    "{}\t{}\t{}\t{} sheets\t{} rows",
                    project.id, project.template_name, project.imported_at, project.sheet_count, project.row_count
                );
            }
        }
    }
    Ok(())
}

fn template(name: &str) -> anyhow::Result<ImportTemplate> {
    ImportTemplate::by_name(name).with_context(|| format!("Unknown import template '{name}'"))
}

fn open_store(path: &Path) -> anyhow::Result<DuckDbStore> {
    DuckDbStore::open(path).with_context(|| format!("Failed to open database {}", path.display()))
}
