use super::{build_kernel, json_pretty, CommandError, GlobalOptions, OutputFormat, EXIT_SUCCESS};
use atrium_instance::InstanceError;
use std::collections::BTreeMap;

const KNOWN_PROPERTIES: [&str; 3] = ["flavor", "version", "build"];

pub fn run(
    options: &GlobalOptions,
    property: Option<&str>,
    refresh: bool,
    format: OutputFormat,
) -> Result<u8, CommandError> {
    let mut kernel = build_kernel(options);
    kernel.boot().map_err(|e| e.to_string())?;

    let failure = kernel.state().last_error().map(|f| f.message.clone());
    let Some(instance) = kernel.instance_mut() else {
        // No handle at all means discovery itself failed at the root level.
        return Err(CommandError::boot_incomplete(
            failure.unwrap_or_else(|| "no instance resolved".to_owned()),
        ));
    };

    let mut values = BTreeMap::new();
    match property {
        Some(name) => {
            let value = instance.info(name, refresh).map_err(|e| e.to_string())?;
            values.insert(name.to_owned(), value);
        }
        None => {
            for name in KNOWN_PROPERTIES {
                match instance.info(name, refresh) {
                    Ok(value) => {
                        values.insert(name.to_owned(), value);
                    }
                    // A property the release file simply does not set.
                    Err(InstanceError::UnsupportedProperty { .. }) => {}
                    Err(e) => return Err(e.to_string().into()),
                }
            }
        }
    }

    match format {
        OutputFormat::Json => println!("{}", json_pretty(&values)?),
        OutputFormat::Table => match property {
            // Bare value for a single property, scripting-friendly.
            Some(name) => {
                if let Some(value) = values.get(name) {
                    println!("{value}");
                }
            }
            None => {
                for (name, value) in &values {
                    println!("{name:8} {value}");
                }
            }
        },
    }
    Ok(EXIT_SUCCESS)
}
