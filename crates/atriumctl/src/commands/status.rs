use super::{
    build_kernel, colorize_level, json_pretty, CommandError, GlobalOptions, OutputFormat,
    EXIT_BOOT_INCOMPLETE, EXIT_SUCCESS,
};
use atrium_boot::BootLevel;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct StatusReport {
    level: &'static str,
    rank: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    root: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    family: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    flavor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    build: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    database: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub fn run(options: &GlobalOptions, format: OutputFormat) -> Result<u8, CommandError> {
    let mut kernel = build_kernel(options);
    let level = kernel.boot().map_err(|e| e.to_string())?;
    let error = kernel
        .state()
        .last_error()
        .map(|f| format!("{} (at level {})", f.message, f.level));

    let mut report = StatusReport {
        level: level.name(),
        rank: level.rank(),
        root: None,
        family: None,
        flavor: None,
        version: None,
        build: None,
        database: None,
        user: None,
        error,
    };

    if let Some(instance) = kernel.instance_mut() {
        report.root = Some(instance.path().to_string());
        report.family = Some(instance.family());
        report.flavor = instance.info("flavor", false).ok();
        report.version = instance.info("version", false).ok();
        report.build = instance.info("build", false).ok();
        report.database = instance.connection().map(|c| c.dsn.clone());
        report.user = instance.user().map(|u| u.name.clone());
    }

    match format {
        OutputFormat::Json => println!("{}", json_pretty(&report)?),
        OutputFormat::Table => print_table(&report, level),
    }

    if report.error.is_none() {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_BOOT_INCOMPLETE)
    }
}

fn print_table(report: &StatusReport, level: BootLevel) {
    println!(
        "level:     {} ({}/{})",
        colorize_level(level),
        report.rank,
        BootLevel::ALL.len()
    );
    if let Some(root) = &report.root {
        println!("root:      {root}");
    }
    if let Some(family) = report.family {
        println!("family:    {family}");
    }
    if let Some(flavor) = &report.flavor {
        println!("flavor:    {flavor}");
    }
    if let Some(version) = &report.version {
        println!("version:   {version}");
    }
    if let Some(build) = &report.build {
        println!("build:     {build}");
    }
    if let Some(database) = &report.database {
        println!("database:  {database}");
    }
    if let Some(user) = &report.user {
        println!("user:      {user}");
    }
    if let Some(error) = &report.error {
        println!(
            "error:     {}",
            console::Style::new().red().apply_to(error)
        );
    }
}
