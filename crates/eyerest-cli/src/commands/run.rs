use clap::Args;
use eyerest_core::{
    spawn, ActivityClock, Config, FixedIdle, SessionContext, SessionHandle, SessionWorker,
    StatisticsLedger, WorkParams,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

const HELP: &str = "commands: start [work_min] [rest_min] | stop | rest | pause | resume | \
                    unlock <phrase> | idle <secs> | status | help | quit";

#[derive(Args)]
pub struct RunArgs {
    /// Start a work period immediately
    #[arg(long)]
    start: bool,

    /// Take idle time from the `idle` command instead of stdin activity
    #[arg(long)]
    manual_idle: bool,
}

/// One line typed on stdin.
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Start {
        work: Option<u32>,
        rest: Option<u32>,
    },
    Stop,
    Rest,
    Pause,
    Resume,
    Unlock(String),
    Idle(u64),
    Status,
    Help,
    Quit,
}

impl Command {
    /// `Ok(None)` for a blank line.
    fn parse(line: &str) -> Result<Option<Self>, String> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(None);
        };

        let command = match verb {
            "start" => Command::Start {
                work: words.next().map(parse_minutes).transpose()?,
                rest: words.next().map(parse_minutes).transpose()?,
            },
            "stop" => Command::Stop,
            "rest" => Command::Rest,
            "pause" => Command::Pause,
            "resume" => Command::Resume,
            "unlock" => {
                let phrase = words.collect::<Vec<_>>().join(" ");
                if phrase.is_empty() {
                    return Err("unlock needs a phrase".into());
                }
                Command::Unlock(phrase)
            }
            "idle" => {
                let secs = words.next().ok_or("idle needs a number of seconds")?;
                Command::Idle(
                    secs.parse()
                        .map_err(|_| format!("not a number of seconds: {secs}"))?,
                )
            }
            "status" => Command::Status,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => return Err(format!("unknown command: {other}")),
        };
        Ok(Some(command))
    }
}

fn parse_minutes(word: &str) -> Result<u32, String> {
    match word.parse::<u32>() {
        Ok(0) | Err(_) => Err(format!("not a positive number of minutes: {word}")),
        Ok(minutes) => Ok(minutes),
    }
}

fn work_params(config: &Config, work: Option<u32>, rest: Option<u32>) -> WorkParams {
    WorkParams {
        play_sound_after_rest: config.play_sound_after_rest,
        allow_password_skip: config.allow_password_skip,
        ..WorkParams::new(
            work.unwrap_or(config.work_time),
            rest.unwrap_or(config.rest_time),
        )
    }
}

/// Where idle time comes from in the foreground runner.
enum Presence {
    Stdin(ActivityClock),
    Manual(FixedIdle),
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(serve(args))
}

async fn serve(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let ledger = StatisticsLedger::open_default();

    let presence = if args.manual_idle {
        Presence::Manual(FixedIdle::new(0))
    } else {
        Presence::Stdin(ActivityClock::new())
    };
    let mut ctx = match &presence {
        Presence::Stdin(clock) => SessionContext::new(config.clone(), clock.clone()),
        Presence::Manual(fixed) => SessionContext::new(config.clone(), fixed.clone()),
    }
    .with_ledger(ledger);
    if let Ok(path) = Config::path() {
        ctx = ctx.with_config_path(path);
    }

    let SessionWorker {
        handle,
        mut notifications,
        join,
    } = spawn(ctx);

    let printer = tokio::spawn(async move {
        while let Some(notification) = notifications.recv().await {
            match serde_json::to_string(&notification) {
                Ok(line) => println!("{line}"),
                Err(e) => warn!(error = %e, "notification not printable"),
            }
        }
    });

    if args.start {
        handle.start_work(work_params(&config, None, None))?;
    }
    info!("eyerest running, type `help` for commands");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    warn!(error = %e, "ctrl-c listener failed");
                }
                info!("interrupted");
                break;
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                if let Presence::Stdin(clock) = &presence {
                    clock.record_activity();
                }
                match Command::parse(&line) {
                    Ok(None) => {}
                    Ok(Some(Command::Quit)) => break,
                    Ok(Some(command)) => execute(command, &handle, &presence)?,
                    Err(message) => eprintln!("{message}"),
                }
            }
        }
    }

    handle.shutdown();
    join.await?;
    printer.await?;
    Ok(())
}

fn execute(
    command: Command,
    handle: &SessionHandle,
    presence: &Presence,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Start { work, rest } => {
            // Picks up edits made with `eyerest config set` while running.
            let config = Config::load_or_default();
            handle.start_work(work_params(&config, work, rest))?;
        }
        Command::Stop => handle.stop_work()?,
        Command::Rest => handle.force_rest()?,
        Command::Pause => handle.temp_pause()?,
        Command::Resume => handle.temp_resume()?,
        Command::Unlock(phrase) => handle.unlock(phrase)?,
        Command::Idle(secs) => match presence {
            Presence::Manual(fixed) => fixed.set(secs),
            Presence::Stdin(_) => eprintln!("idle needs --manual-idle"),
        },
        Command::Status => {
            println!("{}", serde_json::to_string(&handle.snapshot())?);
        }
        Command::Help => eprintln!("{HELP}"),
        Command::Quit => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_start_with_optional_minutes() {
        assert_eq!(
            Command::parse("start").unwrap(),
            Some(Command::Start {
                work: None,
                rest: None
            })
        );
        assert_eq!(
            Command::parse("  start 25 5 ").unwrap(),
            Some(Command::Start {
                work: Some(25),
                rest: Some(5)
            })
        );
        assert!(Command::parse("start 0").is_err());
        assert!(Command::parse("start ten").is_err());
    }

    #[test]
    fn unlock_keeps_the_whole_phrase() {
        assert_eq!(
            Command::parse("unlock let me out").unwrap(),
            Some(Command::Unlock("let me out".into()))
        );
        assert!(Command::parse("unlock").is_err());
    }

    #[test]
    fn idle_takes_seconds() {
        assert_eq!(Command::parse("idle 400").unwrap(), Some(Command::Idle(400)));
        assert!(Command::parse("idle").is_err());
        assert!(Command::parse("idle -3").is_err());
    }

    #[test]
    fn blank_and_unknown_lines() {
        assert_eq!(Command::parse("   ").unwrap(), None);
        assert_eq!(Command::parse("exit").unwrap(), Some(Command::Quit));
        assert!(Command::parse("snooze").is_err());
    }

    #[test]
    fn work_params_fall_back_to_config() {
        let config = Config {
            work_time: 45,
            rest_time: 3,
            allow_password_skip: true,
            ..Config::default()
        };
        let params = work_params(&config, Some(20), None);
        assert_eq!(params.work_time, 20);
        assert_eq!(params.rest_time, 3);
        assert!(params.allow_password_skip);
        assert_eq!(params.idle_detection_enabled, None);
    }
}
