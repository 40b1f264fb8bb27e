use std::{env, path::PathBuf, process};

use clap::{App, Arg, ArgMatches};
use jvm_classloader::{
    Error, ExitCode,
    config::Config,
    runtime::{self, class_loader::cached_archive, method_area, mtable::MTEntry},
};

const MAIN_DESCRIPTOR: &str = "([Ljava/lang/String;)V";

fn main() {
    env_logger::init();

    let matches = App::new("java")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Loads and verifies a Java class and resolves its main method")
        .arg(
            Arg::with_name("classpath")
                .long("cp")
                .alias("classpath")
                .value_name("PATHS")
                .help("Directories and JARs to search for classes")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("jar")
                .long("jar")
                .value_name("JAR")
                .help("Starts from the Main-Class of this JAR")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("preload")
                .long("preload")
                .help("Loads the base classes listed in java.base before starting"),
        )
        .arg(
            Arg::with_name("MAIN_CLASS")
                .help("Class declaring main, dotted or slash-separated")
                .required_unless("jar")
                .index(1),
        )
        .get_matches();

    if let Err(e) = run(&matches) {
        eprintln!("{e}");
        process::exit(e.exit_code().into());
    }
    process::exit(ExitCode::Ok.into());
}

fn run(matches: &ArgMatches<'_>) -> Result<(), Error> {
    let mut config = Config::from_env();
    if let Some(paths) = matches.value_of_os("classpath") {
        config = config.with_class_path(env::split_paths(paths));
    }
    let jar = matches.value_of("jar").map(PathBuf::from);
    if let Some(jar) = &jar {
        config = config.with_starting_jar(jar);
    }
    config = config.with_preload_base_classes(matches.is_present("preload"));
    runtime::init(config)?;

    let main_class = match (matches.value_of("MAIN_CLASS"), &jar) {
        (Some(class), _) => class.trim_end_matches(".class").replace('.', "/"),
        (None, Some(jar)) => {
            let archive = cached_archive(jar)?;
            let Some(class) = archive.main_class() else {
                return Err(Error::Archive(format!(
                    "no Main-Class in the manifest of {}",
                    jar.display()
                )));
            };
            class.replace('.', "/")
        }
        (None, None) => return Err(Error::Archive("no main class given".to_string())),
    };

    let (entry, kind) = runtime::fetch_method_and_cp(&main_class, "main", MAIN_DESCRIPTOR)?;
    match entry {
        MTEntry::Java(method) => println!(
            "{main_class}.main{MAIN_DESCRIPTOR}: {kind:?}, {} bytes of code, max stack {}, max locals {}",
            method.code.len(),
            method.max_stack,
            method.max_locals
        ),
        MTEntry::Native(native) => println!(
            "{main_class}.main{MAIN_DESCRIPTOR}: {kind:?}, {} parameter slots",
            native.param_slots
        ),
    }
    log::info!("{} classes in the method area", method_area::size());
    Ok(())
}
