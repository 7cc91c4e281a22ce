use platform_inject::transform::properties::{
    INJECT_INJECTABLES, PLATFORM_NAME, PLATFORM_PACKAGE, UNIQUE_IDENTIFIER,
};
use platform_inject::transform::{
    Diagnostics, DirectoryAccess, Error, Injector, Properties, SimpleTransformerContext,
};

use clap::{value_parser, Arg, ArgAction, Command};
use std::fs;
use std::io;
use std::path::PathBuf;
use walkdir::WalkDir;

fn main() -> Result<(), Error> {
    env_logger::init();

    let matches = Command::new("Platform injector")
        .version(clap::crate_version!())
        .about("Rewrite compiled classes so @ExpectPlatform methods call platform implementations")
        .arg(
            Arg::new("properties")
                .long("properties")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .action(ArgAction::Set)
                .help("Read properties from a `.properties` file"),
        )
        .arg(
            Arg::new("define")
                .short('D')
                .value_name("KEY=VALUE")
                .action(ArgAction::Append)
                .help("Set a property (overrides the properties file)"),
        )
        .arg(
            Arg::new("platform")
                .long("platform")
                .value_name("NAME")
                .action(ArgAction::Set)
                .help("Platform being built (eg. `fabric`, `forge`)"),
        )
        .arg(
            Arg::new("platform-package")
                .long("platform-package")
                .value_name("PACKAGE")
                .action(ArgAction::Set)
                .help("Package segment of platform implementations, if not the platform name"),
        )
        .arg(
            Arg::new("unique-id")
                .long("unique-id")
                .value_name("NAMESPACE")
                .action(ArgAction::Set)
                .help("Namespace of injected classes (eg. `gen/mymod`)"),
        )
        .arg(
            Arg::new("no-inject")
                .long("no-inject")
                .action(ArgAction::SetTrue)
                .help("Copy classes without transforming them"),
        )
        .arg(
            Arg::new("INPUT")
                .help("Directory of compiled classes")
                .value_parser(value_parser!(PathBuf))
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("OUTPUT")
                .help("Directory to write the transformed classes into")
                .value_parser(value_parser!(PathBuf))
                .required(true)
                .index(2),
        )
        .get_matches();

    // Later sources of properties override earlier ones
    let mut properties = Properties::new();
    if let Some(path) = matches.get_one::<PathBuf>("properties") {
        log::info!("Reading properties from '{}'", path.display());
        properties.extend(&Properties::parse(&fs::read_to_string(path)?));
    }
    for pair in matches.get_many::<String>("define").into_iter().flatten() {
        let (key, value) = Properties::parse_pair(pair);
        properties.set(key, value);
    }
    let shorthands = [
        ("platform", PLATFORM_NAME),
        ("platform-package", PLATFORM_PACKAGE),
        ("unique-id", UNIQUE_IDENTIFIER),
    ];
    for (arg, key) in shorthands {
        if let Some(value) = matches.get_one::<String>(arg) {
            properties.set(key, value.as_str());
        }
    }
    if matches.get_flag("no-inject") {
        properties.set(INJECT_INJECTABLES, "false");
    }

    let input = matches.get_one::<PathBuf>("INPUT").unwrap();
    let output = matches.get_one::<PathBuf>("OUTPUT").unwrap();
    let injector = Injector::new(&properties);
    let mut diagnostics = Diagnostics::new();

    let mut rewritten = 0;
    let mut copied = 0;
    for entry in WalkDir::new(input) {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(input).unwrap_or(entry.path());
        let destination = output.join(relative);
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }

        let is_class = entry.path().extension().map_or(false, |ext| ext == "class");
        if is_class {
            let bytes = fs::read(entry.path())?;
            if let Some(transformed) = injector.transform_class_bytes(&bytes, &mut diagnostics)? {
                log::debug!("Writing rewritten '{}'", destination.display());
                fs::write(&destination, transformed)?;
                rewritten += 1;
                continue;
            }
        }
        fs::copy(entry.path(), &destination)?;
        copied += 1;
    }

    let context = SimpleTransformerContext::new(
        |arguments: &[String]| log::info!("Build arguments to add: {:?}", arguments),
        true,
        true,
        true,
    );
    injector.inject_assets(&context, &mut DirectoryAccess::new(output))?;

    log::info!(
        "Rewrote {} classes and copied {} unchanged files into '{}'",
        rewritten,
        copied,
        output.display()
    );
    if !diagnostics.is_empty() {
        log::warn!("{} problems reported", diagnostics.len());
    }

    Ok(())
}
