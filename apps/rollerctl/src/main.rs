//! rollerctl - operate a roller update server database
//!
//! Manages the catalog (applications, packages, channels, groups), drives
//! the rollout engine by hand (check-ins and client events) and inspects
//! instances and the activity log.

mod cli;
mod display;
mod error;
mod logging;

use crate::cli::{AppCommands, ChannelCommands, Cli, Commands, GroupCommands, PackageCommands};
use crate::display::{CommandOutput, OutputRenderer};
use crate::error::CliError;
use clap::Parser;
use roller_config::Config;
use roller_events::EventReceiver;
use roller_rollout::{EventReport, Rollout};
use roller_types::{ActivityQuery, InstancesQuery, NewChannel, NewGroup, NewPackage, Page};
use std::process;
use tokio::select;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_mode = cli.global.json;

    let config = match load_config(&cli).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };
    logging::init_tracing(config.logging.json, cli.global.debug, &config.logging.level);

    if let Err(e) = run(cli, config).await {
        error!("Application error: {}", e);
        if !json_mode {
            eprintln!("Error: {e}");
        }
        process::exit(1);
    }
}

/// Configuration precedence: file (or defaults), then environment, then
/// command line flags.
async fn load_config(cli: &Cli) -> Result<Config, CliError> {
    let mut config = Config::load_or_default(cli.global.config.as_deref()).await?;
    config.merge_env()?;
    if let Some(db) = &cli.global.db {
        config.database.path = Some(db.clone());
    }
    config.validate()?;
    Ok(config)
}

async fn run(cli: Cli, config: Config) -> Result<(), CliError> {
    info!("Starting rollerctl v{}", env!("CARGO_PKG_VERSION"));

    let (event_sender, event_receiver) = roller_events::channel();
    let rollout = Rollout::open(&config).await?.with_events(event_sender);
    info!(db = %config.db_path().display(), "database ready");

    let renderer = OutputRenderer::new(cli.global.json);
    let output = execute_command_with_events(cli.command, rollout, &config, event_receiver).await?;
    renderer.render(&output)?;

    info!("Command completed successfully");
    Ok(())
}

/// Execute command while forwarding engine events to the log
async fn execute_command_with_events(
    command: Commands,
    rollout: Rollout,
    config: &Config,
    mut event_receiver: EventReceiver,
) -> Result<CommandOutput, CliError> {
    let mut command_future = Box::pin(execute_command(command, rollout, config));

    loop {
        select! {
            result = &mut command_future => {
                while let Ok(event) = event_receiver.try_recv() {
                    logging::log_event_with_tracing(&event);
                }
                return result;
            }

            event = event_receiver.recv() => {
                if let Some(event) = event {
                    logging::log_event_with_tracing(&event);
                }
            }
        }
    }
}

async fn execute_command(
    command: Commands,
    rollout: Rollout,
    config: &Config,
) -> Result<CommandOutput, CliError> {
    match command {
        Commands::Init => Ok(CommandOutput::Message(format!(
            "Database ready at {}",
            config.db_path().display()
        ))),

        Commands::App(cmd) => match cmd {
            AppCommands::Add { name, description } => Ok(CommandOutput::Application(
                rollout.add_application(&name, &description).await?,
            )),
            AppCommands::Show { id } => {
                Ok(CommandOutput::Application(rollout.get_application(&id).await?))
            }
        },

        Commands::Package(cmd) => match cmd {
            PackageCommands::Add(args) => {
                let package = NewPackage {
                    application_id: args.app.clone(),
                    version: args.version.clone(),
                    url: args.url.clone(),
                    filename: args.filename.clone(),
                    description: args.description.clone(),
                    size: args.size.clone(),
                    hash: args.hash.clone(),
                    kind: args.kind(),
                    channels_blacklist: args.channels_blacklist.clone(),
                };
                Ok(CommandOutput::Package(rollout.add_package(&package).await?))
            }
            PackageCommands::Show { id } => {
                Ok(CommandOutput::Package(rollout.get_package(&id).await?))
            }
        },

        Commands::Channel(cmd) => match cmd {
            ChannelCommands::Add {
                name,
                app,
                color,
                package,
            } => {
                let channel = NewChannel {
                    name,
                    color,
                    application_id: app,
                    package_id: package,
                };
                Ok(CommandOutput::Channel(rollout.add_channel(&channel).await?))
            }
            ChannelCommands::SetPackage { id, package } => {
                let current = rollout.get_channel(&id).await?;
                let channel = NewChannel {
                    name: current.name,
                    color: current.color,
                    application_id: current.application_id,
                    package_id: Some(package),
                };
                Ok(CommandOutput::Channel(
                    rollout.update_channel(&id, &channel).await?,
                ))
            }
            ChannelCommands::Show { id } => {
                Ok(CommandOutput::Channel(rollout.get_channel(&id).await?))
            }
        },

        Commands::Group(cmd) => execute_group_command(cmd, &rollout).await,

        Commands::Check {
            instance,
            ip,
            version,
            app,
            group,
        } => {
            let package = rollout
                .get_update_package(&instance, &ip, &version, &app, &group)
                .await?;
            Ok(CommandOutput::Granted(package))
        }

        Commands::Event {
            instance,
            app,
            group,
            event_type,
            result,
            previous_version,
            error_code,
        } => {
            rollout
                .register_event(&EventReport {
                    instance_id: instance.clone(),
                    application_id: app,
                    group_id: group,
                    event_type,
                    event_result: result,
                    previous_version,
                    error_code,
                })
                .await?;
            Ok(CommandOutput::Message(format!(
                "Event {event_type}/{result} recorded for {instance}"
            )))
        }

        Commands::Instance { id, app } => {
            Ok(CommandOutput::Instance(rollout.get_instance(&id, &app).await?))
        }

        Commands::Instances {
            app,
            group,
            status,
            version,
            page,
        } => {
            let query = InstancesQuery {
                application_id: app,
                group_id: group,
                status,
                version,
                page: Page::new(page.page, page.per_page),
            };
            Ok(CommandOutput::Instances(rollout.get_instances(&query).await?))
        }

        Commands::History {
            instance,
            app,
            group,
            limit,
        } => Ok(CommandOutput::History(
            rollout
                .get_instance_status_history(&instance, &app, &group, limit)
                .await?,
        )),

        Commands::Activity {
            app,
            group,
            channel,
            instance,
            version,
            severity,
            page,
        } => {
            let query = ActivityQuery {
                application_id: app,
                group_id: group,
                channel_id: channel,
                instance_id: instance,
                version,
                severity,
                start: None,
                end: None,
                page: Page::new(page.page, page.per_page),
            };
            Ok(CommandOutput::Activity(rollout.get_activity(&query).await?))
        }
    }
}

async fn execute_group_command(
    command: GroupCommands,
    rollout: &Rollout,
) -> Result<CommandOutput, CliError> {
    match command {
        GroupCommands::Add {
            name,
            app,
            description,
            channel,
            policy,
        } => {
            let group = NewGroup {
                name,
                description,
                application_id: app,
                channel_id: channel,
                policy: policy.apply(roller_types::GroupPolicy::default()),
            };
            Ok(CommandOutput::Group(Box::new(
                rollout.add_group(&group).await?,
            )))
        }
        GroupCommands::Update {
            id,
            name,
            channel,
            policy,
        } => {
            let current = rollout.get_group(&id).await?;
            let group = NewGroup {
                name: name.unwrap_or(current.name),
                description: current.description,
                application_id: current.application_id,
                channel_id: channel.or(current.channel_id),
                policy: policy.apply(current.policy),
            };
            Ok(CommandOutput::Group(Box::new(
                rollout.update_group(&id, &group).await?,
            )))
        }
        GroupCommands::Show { id } => Ok(CommandOutput::Group(Box::new(
            rollout.get_group(&id).await?,
        ))),
        GroupCommands::List { app } => Ok(CommandOutput::Groups(rollout.get_groups(&app).await?)),
        GroupCommands::Stats { id, version } => {
            if !roller_types::is_valid_version(&version) {
                return Err(CliError::InvalidArguments(format!(
                    "not a semantic version: {version}"
                )));
            }
            Ok(CommandOutput::Stats(
                rollout.get_group_updates_stats(&id, &version).await?,
            ))
        }
    }
}
