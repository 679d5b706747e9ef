//! `famlink` command-line front end.
//!
//! # Responsibility
//! - Map subcommands onto `famlink_core` services.
//! - Print redirect locations and records in a stable plain-text form.

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use famlink_core::db::{open_db, open_db_in_memory};
use famlink_core::{
    init_logging, normalize_fact_lines, AddChildRequest, AddChildService, CoreConfig,
    FactLineInput, LinkPolicy, RecordKind, RecordRepository, Role, RoleAccessGate,
    SqliteRecordRepository, TreeName, UserContext, Xref,
};
use log::info;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

type CliResult<T> = Result<T, Box<dyn Error>>;

fn main() -> ExitCode {
    let matches = cli().get_matches();
    match run(&matches) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn cli() -> Command {
    let fact_arg = Arg::new("fact")
        .long("fact")
        .action(ArgAction::Append)
        .value_name("LEVEL TAG VALUE")
        .help("Fact line, repeatable, e.g. --fact \"1 NAME Ada /Lovelace/\"");

    Command::new("famlink")
        .version(famlink_core::core_version())
        .about("Link people and families in a tagged-text record store")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("JSON config file"),
        )
        .arg(
            Arg::new("db")
                .long("db")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("SQLite database path (overrides config)"),
        )
        .arg(
            Arg::new("base-url")
                .long("base-url")
                .global(true)
                .help("Site base URL used for redirects (overrides config)"),
        )
        .arg(
            Arg::new("log-dir")
                .long("log-dir")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Absolute directory for rolling log files (overrides config)"),
        )
        .subcommand(
            Command::new("add-person")
                .about("Create an individual from fact lines")
                .arg(Arg::new("tree").required(true))
                .arg(fact_arg.clone()),
        )
        .subcommand(
            Command::new("add-child")
                .about("Add a new child to an existing individual")
                .arg(Arg::new("tree").required(true))
                .arg(Arg::new("xref").required(true).help("Existing parent, e.g. I1"))
                .arg(fact_arg)
                .arg(Arg::new("url").long("url").help("Return URL after success"))
                .arg(
                    Arg::new("user")
                        .long("user")
                        .default_value("cli")
                        .help("Acting user, recorded in the cli_command log line"),
                )
                .arg(
                    Arg::new("role")
                        .long("role")
                        .default_value("editor")
                        .value_parser(["visitor", "member", "editor", "manager"])
                        .help("Role of the acting user in the tree"),
                )
                .arg(
                    Arg::new("policy")
                        .long("policy")
                        .default_value("child-sex")
                        .value_parser(["child-sex", "parent-sex"])
                        .help("Which sex decides the parent's HUSB/WIFE role"),
                ),
        )
        .subcommand(
            Command::new("show")
                .about("Print a record as tagged text")
                .arg(Arg::new("tree").required(true))
                .arg(Arg::new("xref").required(true))
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
}

fn run(matches: &ArgMatches) -> CliResult<()> {
    let config = load_config(matches)?;
    if let Some(dir) = &config.log_dir {
        init_logging(&config.log_level, &dir.to_string_lossy())?;
    }

    let conn = if config.uses_memory_db() {
        open_db_in_memory()?
    } else {
        open_db(&config.db_path)?
    };
    let repo = SqliteRecordRepository::with_prefixes(&conn, config.xref_prefixes())?;

    match matches.subcommand() {
        Some(("add-person", args)) => {
            let tree = TreeName::parse(required(args, "tree")?)?;
            let facts = normalize_fact_lines(&fact_input(args))?;
            repo.ensure_tree(&tree)?;
            let person = repo.create_record(&tree, RecordKind::Individual, &facts)?;
            info!(
                "event=cli_command module=cli status=ok command=add-person tree={} xref={}",
                tree, person.xref
            );
            println!("{}", person.xref);
        }
        Some(("add-child", args)) => {
            let tree = required(args, "tree")?;
            let role = parse_role(required(args, "role")?)?;
            let user_name = required(args, "user")?;
            let user = UserContext::new(user_name).with_role(TreeName::parse(tree)?, role);
            let policy = match required(args, "policy")? {
                "parent-sex" => LinkPolicy::ParentSex,
                _ => LinkPolicy::ChildSex,
            };

            let service = AddChildService::new(&repo, RoleAccessGate::new(user)).with_policy(policy);
            let outcome = service.add_child(&AddChildRequest {
                tree: tree.to_string(),
                xref: required(args, "xref")?.to_string(),
                facts: fact_input(args),
                url: args.get_one::<String>("url").cloned(),
                base_url: config.base_url.clone(),
            })?;
            info!(
                "event=cli_command module=cli status=ok command=add-child tree={} user={} role={} parent={} child={} family={}",
                tree,
                user_name,
                role.as_str(),
                outcome.parent.xref,
                outcome.child.xref,
                outcome.family.xref
            );
            println!("child={}", outcome.child.xref);
            println!("family={}", outcome.family.xref);
            println!("Location: {}", outcome.redirect.location);
        }
        Some(("show", args)) => {
            let tree = TreeName::parse(required(args, "tree")?)?;
            let xref = Xref::parse(required(args, "xref")?)?;
            let record = repo
                .get_record(&tree, &xref)?
                .ok_or_else(|| format!("record not found: {tree}/{xref}"))?;
            if args.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&record)?);
            } else {
                println!("{}", record.to_gedcom());
            }
        }
        Some((other, _)) => return Err(format!("unknown subcommand `{other}`").into()),
        None => return Err("missing subcommand".into()),
    }
    Ok(())
}

fn load_config(matches: &ArgMatches) -> CliResult<CoreConfig> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => CoreConfig::load(path)?,
        None => CoreConfig::default(),
    };
    if let Some(db) = matches.get_one::<PathBuf>("db") {
        config.db_path = db.clone();
    }
    if let Some(base_url) = matches.get_one::<String>("base-url") {
        config.base_url = base_url.clone();
    }
    if let Some(dir) = matches.get_one::<PathBuf>("log-dir") {
        config.log_dir = Some(dir.clone());
    }
    config.validate()?;
    Ok(config)
}

fn required<'a>(args: &'a ArgMatches, name: &str) -> CliResult<&'a str> {
    args.get_one::<String>(name)
        .map(String::as_str)
        .ok_or_else(|| format!("missing argument `{name}`").into())
}

fn fact_input(args: &ArgMatches) -> FactLineInput {
    let lines: Vec<&str> = args
        .get_many::<String>("fact")
        .map(|values| values.map(String::as_str).collect())
        .unwrap_or_default();
    FactLineInput::from_text_lines(&lines)
}

fn parse_role(value: &str) -> CliResult<Role> {
    match value {
        "visitor" => Ok(Role::Visitor),
        "member" => Ok(Role::Member),
        "editor" => Ok(Role::Editor),
        "manager" => Ok(Role::Manager),
        other => Err(format!("unknown role `{other}`").into()),
    }
}
