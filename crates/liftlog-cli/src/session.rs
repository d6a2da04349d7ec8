//! Interactive session commands
//!
//! One line of input is one command. Parsing is separate from execution so
//! the grammar can be tested without a running session.

use liftlog_core::domain::workout::{SessionAlert, SessionController, SessionEvent, SessionProjection, Workout};

pub const HELP: &str = "\
Commands:
  add NAME [SETS [REPS [REST]]]   add an exercise (defaults from config)
  log WEIGHT REPS                 log the next set of the current exercise
  quick                           repeat the last logged weight/reps
  edit EX SET WEIGHT REPS         pre-fill a set that is not logged yet
  undo                            undo the last logged set (short window)
  next | prev | goto N            move between exercises
  skip                            skip the running rest
  rest +N | rest -N               lengthen or shorten the running rest
  status                          show the current state
  events                          show the session event log
  end                             finish and save the workout
  cancel                          discard the workout
  help                            show this help";

/// A parsed input line
#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    Add {
        name: String,
        sets: Option<u32>,
        reps: Option<String>,
        rest_secs: Option<u64>,
    },
    Log {
        weight: f64,
        reps: u32,
    },
    Quick,
    /// Exercise and set numbers are 1-based
    Edit {
        exercise: usize,
        set: usize,
        weight: f64,
        reps: u32,
    },
    Undo,
    Next,
    Prev,
    Goto(usize),
    Skip,
    Rest(i64),
    Status,
    Events,
    End,
    Cancel,
    Help,
    Empty,
}

impl ReplCommand {
    pub fn parse(line: &str) -> Result<Self, String> {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            return Ok(Self::Empty);
        };
        let args: Vec<&str> = words.collect();

        match command.to_lowercase().as_str() {
            "add" | "a" => parse_add(&args),
            "log" | "l" => match args.as_slice() {
                [weight, reps] => Ok(Self::Log {
                    weight: parse_number(weight, "weight")?,
                    reps: parse_number(reps, "reps")?,
                }),
                _ => Err("usage: log WEIGHT REPS".to_string()),
            },
            "quick" | "q" => Ok(Self::Quick),
            "edit" => match args.as_slice() {
                [exercise, set, weight, reps] => Ok(Self::Edit {
                    exercise: parse_position(exercise, "exercise")?,
                    set: parse_position(set, "set")?,
                    weight: parse_number(weight, "weight")?,
                    reps: parse_number(reps, "reps")?,
                }),
                _ => Err("usage: edit EX SET WEIGHT REPS".to_string()),
            },
            "undo" | "u" => Ok(Self::Undo),
            "next" | "n" => Ok(Self::Next),
            "prev" | "p" => Ok(Self::Prev),
            "goto" | "g" => match args.as_slice() {
                [index] => Ok(Self::Goto(parse_position(index, "exercise")?)),
                _ => Err("usage: goto N".to_string()),
            },
            "skip" | "s" => Ok(Self::Skip),
            "rest" => match args.as_slice() {
                [delta] => Ok(Self::Rest(parse_number(delta.trim_start_matches('+'), "seconds")?)),
                _ => Err("usage: rest +N | rest -N".to_string()),
            },
            "status" | "st" => Ok(Self::Status),
            "events" => Ok(Self::Events),
            "end" | "finish" => Ok(Self::End),
            "cancel" => Ok(Self::Cancel),
            "help" | "h" | "?" => Ok(Self::Help),
            other => Err(format!("unknown command '{}', type 'help'", other)),
        }
    }
}

/// `add Bench Press 4 6-8 150`: the name runs up to the first number
fn parse_add(args: &[&str]) -> Result<ReplCommand, String> {
    let split = args
        .iter()
        .position(|word| word.parse::<u32>().is_ok())
        .unwrap_or(args.len());
    let (name, rest) = args.split_at(split);
    if name.is_empty() {
        return Err("usage: add NAME [SETS [REPS [REST]]]".to_string());
    }

    let sets = rest.first().map(|s| parse_number(s, "sets")).transpose()?;
    let reps = rest.get(1).map(|s| s.to_string());
    let rest_secs = rest.get(2).map(|s| parse_number(s, "rest")).transpose()?;
    if rest.len() > 3 {
        return Err("usage: add NAME [SETS [REPS [REST]]]".to_string());
    }

    Ok(ReplCommand::Add {
        name: name.join(" "),
        sets,
        reps,
        rest_secs,
    })
}

fn parse_number<T: std::str::FromStr>(value: &str, what: &str) -> Result<T, String> {
    value
        .parse()
        .map_err(|_| format!("invalid {}: '{}'", what, value))
}

fn parse_position(value: &str, what: &str) -> Result<usize, String> {
    let position: usize = parse_number(value, what)?;
    position
        .checked_sub(1)
        .ok_or_else(|| format!("{} numbers start at 1", what))
}

/// What the loop should do after a command
#[derive(Debug)]
pub enum Step {
    Continue(String),
    Ended(Option<Workout>),
    Cancelled,
}

pub fn execute(controller: &SessionController, command: ReplCommand) -> Step {
    let outcome = |applied: bool, ok: String, no_op: &str| {
        if applied {
            Step::Continue(ok)
        } else {
            Step::Continue(no_op.to_string())
        }
    };

    match command {
        ReplCommand::Add {
            name,
            sets,
            reps,
            rest_secs,
        } => {
            let defaults = controller.session_config().clone();
            let added = controller.add_exercise(
                name.clone(),
                sets.unwrap_or(defaults.default_target_sets),
                reps.unwrap_or(defaults.default_target_reps.clone()),
                rest_secs
                    .map(std::time::Duration::from_secs)
                    .unwrap_or_else(|| defaults.default_rest()),
            );
            outcome(added.is_some(), format!("Added {}", name), "No active session")
        }
        ReplCommand::Log { weight, reps } => outcome(
            controller.complete_current_set(weight, reps),
            render_status(&controller.projection()),
            "Nothing to log here, move to another exercise",
        ),
        ReplCommand::Quick => outcome(
            controller.quick_complete_set(),
            render_status(&controller.projection()),
            "No previous set to repeat",
        ),
        ReplCommand::Edit {
            exercise,
            set,
            weight,
            reps,
        } => outcome(
            controller.update_set(exercise, set, Some(weight), Some(reps)),
            "Set updated".to_string(),
            "Only sets that are not logged yet can be edited",
        ),
        ReplCommand::Undo => outcome(
            controller.undo_last_action(),
            "Undone".to_string(),
            "Nothing to undo",
        ),
        ReplCommand::Next => outcome(
            controller.next_exercise(),
            render_status(&controller.projection()),
            "Already at the last exercise",
        ),
        ReplCommand::Prev => outcome(
            controller.previous_exercise(),
            render_status(&controller.projection()),
            "Already at the first exercise",
        ),
        ReplCommand::Goto(index) => outcome(
            controller.go_to_exercise(index),
            render_status(&controller.projection()),
            "No such exercise",
        ),
        ReplCommand::Skip => outcome(controller.skip_rest(), "Rest skipped".to_string(), "Not resting"),
        ReplCommand::Rest(delta) => outcome(
            controller.adjust_rest(delta),
            format!("Rest {}", render_rest(&controller.projection())),
            "Not resting",
        ),
        ReplCommand::Status => Step::Continue(render_status(&controller.projection())),
        ReplCommand::Events => Step::Continue(render_events(controller)),
        ReplCommand::End => Step::Ended(controller.end_workout()),
        ReplCommand::Cancel => {
            controller.cancel_workout();
            Step::Cancelled
        }
        ReplCommand::Help => Step::Continue(HELP.to_string()),
        ReplCommand::Empty => Step::Continue(String::new()),
    }
}

pub fn render_status(projection: &SessionProjection) -> String {
    let mut out = format!(
        "{} [{}] {} sets done",
        projection.session_name,
        projection.elapsed_display(),
        projection.total_sets_completed
    );
    match &projection.exercise_name {
        Some(name) => {
            out.push_str(&format!(
                "\n  {} - set {}/{}",
                name, projection.current_set, projection.total_sets
            ));
            if let (Some(weight), Some(reps)) = (projection.last_weight, projection.last_reps) {
                out.push_str(&format!(" (last {} x {})", weight, reps));
            }
        }
        None => out.push_str("\n  No exercises yet, try 'add'"),
    }
    if projection.is_resting {
        out.push_str(&format!("\n  Resting {}", render_rest(projection)));
    }
    out
}

fn render_rest(projection: &SessionProjection) -> String {
    if projection.is_resting {
        format!("{} left", projection.rest_display())
    } else {
        "done".to_string()
    }
}

fn render_events(controller: &SessionController) -> String {
    controller
        .events()
        .iter()
        .map(|logged| {
            let detail = match &logged.event {
                SessionEvent::SetLogged { weight, reps, .. } => format!(" {} x {}", weight, reps),
                SessionEvent::ExerciseStarted { name, .. } => format!(" {}", name),
                SessionEvent::RestTimerStarted { duration_secs, .. } => format!(" {}s", duration_secs),
                SessionEvent::RestTimerSkipped { remaining_secs } => format!(" {}s left", remaining_secs),
                _ => String::new(),
            };
            format!(
                "{:>3} {} {}{}",
                logged.sequence,
                logged.at.format("%H:%M:%S"),
                logged.event.kind(),
                detail
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_alert(alert: &SessionAlert) -> String {
    match alert {
        SessionAlert::RestNearlyDone { remaining_secs } => format!("** {}s of rest left", remaining_secs),
        SessionAlert::RestFinished { .. } => "** Rest over, next set!".to_string(),
        SessionAlert::UndoWindowClosed { .. } => "(undo no longer available)".to_string(),
    }
}

pub fn render_workout(workout: &Workout) -> String {
    format!(
        "{}  {}  {}m  {} sets  {:.1} volume",
        workout.started_at.format("%Y-%m-%d %H:%M"),
        workout.name,
        workout.duration_secs / 60,
        workout.total_sets_completed,
        workout.total_volume
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_parse_add_with_multiword_name() {
        assert_eq!(
            ReplCommand::parse("add Bench Press 4 6-8 150"),
            Ok(ReplCommand::Add {
                name: "Bench Press".to_string(),
                sets: Some(4),
                reps: Some("6-8".to_string()),
                rest_secs: Some(150),
            })
        );
        assert_eq!(
            ReplCommand::parse("add Squat"),
            Ok(ReplCommand::Add {
                name: "Squat".to_string(),
                sets: None,
                reps: None,
                rest_secs: None,
            })
        );
        assert!(ReplCommand::parse("add 3").is_err());
    }

    #[test]
    fn test_parse_positions_are_one_based() {
        assert_eq!(ReplCommand::parse("goto 2"), Ok(ReplCommand::Goto(1)));
        assert!(ReplCommand::parse("goto 0").is_err());
        assert_eq!(
            ReplCommand::parse("edit 1 2 100 5"),
            Ok(ReplCommand::Edit {
                exercise: 0,
                set: 1,
                weight: 100.0,
                reps: 5,
            })
        );
    }

    #[test]
    fn test_parse_misc() {
        assert_eq!(ReplCommand::parse("   "), Ok(ReplCommand::Empty));
        assert_eq!(
            ReplCommand::parse("log 62.5 8"),
            Ok(ReplCommand::Log { weight: 62.5, reps: 8 })
        );
        assert_eq!(ReplCommand::parse("rest +30"), Ok(ReplCommand::Rest(30)));
        assert_eq!(ReplCommand::parse("rest -15"), Ok(ReplCommand::Rest(-15)));
        assert_eq!(ReplCommand::parse("UNDO"), Ok(ReplCommand::Undo));
        assert!(ReplCommand::parse("log ten 8").is_err());
        assert!(ReplCommand::parse("jump").is_err());
    }

    #[tokio::test]
    async fn test_execute_round() {
        let controller = SessionController::new().unwrap();
        controller.start_session("Test", None);

        let step = execute(&controller, ReplCommand::parse("add Row 2 10 60").unwrap());
        assert!(matches!(step, Step::Continue(ref msg) if msg == "Added Row"));

        execute(&controller, ReplCommand::Log { weight: 50.0, reps: 10 });
        assert_eq!(controller.total_sets_completed(), 1);
        assert_eq!(controller.rest_time_remaining(), 60);

        let status = render_status(&controller.projection());
        assert!(status.contains("Row - set 2/2"));
        assert!(status.contains("last 50 x 10"));
        assert!(status.contains("Resting 1:00 left"));

        match execute(&controller, ReplCommand::End) {
            Step::Ended(Some(workout)) => {
                assert_eq!(workout.total_sets_completed, 1);
                assert_eq!(workout.exercises[0].rest_secs, Duration::from_secs(60).as_secs());
            }
            other => panic!("unexpected step: {:?}", other),
        }
    }

    #[test]
    fn test_render_alerts() {
        assert_eq!(
            render_alert(&SessionAlert::RestNearlyDone { remaining_secs: 10 }),
            "** 10s of rest left"
        );
    }
}
