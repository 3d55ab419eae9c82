use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use spindle_core::ControlLoop;
use spindle_core::config::ControlConfig;
use spindle_core::io::{InputSample, InputSampler, NoopOutputDriver, OutputIntent};
use spindle_core::machine::Transition;
use spindle_core::telemetry::TransitionRecord;
use spindle_core::timer::{TickClock, TickTimers};

/// Upper bound on a single `tick` or `step` request.
const MAX_BATCH: u32 = 600_000;

pub const HELP_TOPICS: &[(&str, &str)] = &[
    (
        "set",
        "set <light|forward|reverse|estop> <on|off>  - change a panel input",
    ),
    (
        "tick",
        "tick <ms>                     - advance time, one loop per millisecond",
    ),
    (
        "step",
        "step [n]                      - run loop iterations without time passing",
    ),
    (
        "status",
        "status                        - show state, outputs and status LED",
    ),
    (
        "trace",
        "trace                         - list recorded transitions",
    ),
    (
        "help",
        "help [topic]                  - show help for a command",
    ),
];

/// Panel switches as the operator sees them; `estop` is the button, not the
/// estop-ok line.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
struct Panel {
    light: bool,
    forward: bool,
    reverse: bool,
    estop: bool,
}

impl InputSampler for Panel {
    fn sample(&mut self) -> InputSample {
        InputSample {
            light: self.light,
            forward: self.forward,
            reverse: self.reverse,
            estop_ok: !self.estop,
        }
    }
}

pub struct Session<'a> {
    control: ControlLoop<'a, TickTimers>,
    panel: Panel,
    driver: NoopOutputDriver,
    transcript: Option<TranscriptLogger>,
}

impl<'a> Session<'a> {
    /// Starts a powered-on controller in `ColdStart` with the estop released.
    pub fn new(timers: &'a TickTimers, transcript: Option<&Path>) -> io::Result<Self> {
        let transcript = transcript.map(TranscriptLogger::create).transpose()?;
        Ok(Self {
            control: ControlLoop::new(timers, ControlConfig::DEFAULT),
            panel: Panel::default(),
            driver: NoopOutputDriver::new(),
            transcript,
        })
    }

    pub fn handle_command(&mut self, line: &str) -> io::Result<Vec<String>> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        let now = self.control.timers().now();
        if let Some(transcript) = self.transcript.as_mut() {
            transcript.append_line(now, TranscriptRole::Host, trimmed)?;
        }

        let mut words = trimmed.split_whitespace();
        let command = words.next().unwrap_or_default().to_ascii_lowercase();
        let args: Vec<&str> = words.collect();
        let lines = match (command.as_str(), args.as_slice()) {
            ("help", []) => help_lines(None),
            ("help", [topic]) => help_lines(Some(topic)),
            ("set", [signal, level]) => self.handle_set(signal, level),
            ("tick", [ms]) => match parse_count(ms) {
                Ok(ms) => self.handle_tick(ms),
                Err(message) => vec![message],
            },
            ("step", []) => self.handle_step(1),
            ("step", [count]) => match parse_count(count) {
                Ok(count) => self.handle_step(count),
                Err(message) => vec![message],
            },
            ("status", []) => self.status_lines(),
            ("trace", []) => self.trace_lines(),
            ("help" | "set" | "tick" | "step" | "status" | "trace", _) => {
                vec![format!("ERR usage {}", usage(&command))]
            }
            _ => vec![format!("ERR unknown command `{command}`; try `help`")],
        };

        self.record_output(&lines)?;
        Ok(lines)
    }

    #[must_use]
    pub fn control(&self) -> &ControlLoop<'a, TickTimers> {
        &self.control
    }

    fn handle_set(&mut self, signal: &str, level: &str) -> Vec<String> {
        let Some(asserted) = parse_level(level) else {
            return vec![format!("ERR level `{level}`; expected on or off")];
        };
        let slot = match signal.to_ascii_lowercase().as_str() {
            "light" => &mut self.panel.light,
            "forward" | "fwd" => &mut self.panel.forward,
            "reverse" | "rev" => &mut self.panel.reverse,
            "estop" => &mut self.panel.estop,
            other => {
                return vec![format!(
                    "ERR signal `{other}`; expected light, forward, reverse or estop"
                )];
            }
        };
        *slot = asserted;
        vec![format!("OK {} {}", signal.to_ascii_lowercase(), on_off(asserted))]
    }

    fn handle_tick(&mut self, ms: u32) -> Vec<String> {
        let timers = self.control.timers();
        let mut lines = Vec::new();
        for _ in 0..ms {
            timers.on_tick();
            if let Some(transition) = self.iterate() {
                lines.push(self.describe_latest(transition));
            }
        }
        lines.push(format!(
            "t={}ms state={}",
            timers.now(),
            self.control.state()
        ));
        lines
    }

    fn handle_step(&mut self, count: u32) -> Vec<String> {
        let mut lines = Vec::new();
        for _ in 0..count {
            if let Some(transition) = self.iterate() {
                lines.push(self.describe_latest(transition));
            }
        }
        lines.push(format!(
            "stepped {count} state={}",
            self.control.state()
        ));
        lines
    }

    fn iterate(&mut self) -> Option<Transition> {
        self.control.run_once(&mut self.panel, &mut self.driver)
    }

    fn describe_latest(&self, transition: Transition) -> String {
        match self.control.log().latest() {
            Some(record) => describe_record(record),
            None => format!("{} -> {}", transition.from, transition.to),
        }
    }

    fn status_lines(&self) -> Vec<String> {
        let control = &self.control;
        let timers = control.timers();
        let status = control.status();
        let mut lines = vec![
            format!(
                "state={} [{}] t={}ms timer={}ms",
                control.state(),
                control.state().letter(),
                timers.now(),
                timers.remaining()
            ),
            format!(
                "inputs light={} forward={} reverse={} estop={}",
                on_off(self.panel.light),
                on_off(self.panel.forward),
                on_off(self.panel.reverse),
                on_off(self.panel.estop)
            ),
            describe_outputs(control.last_outputs()),
            format!(
                "status phase={}/{} period={}ms",
                status.phase() + 1,
                status.sequence().len(),
                status.sequence().period()
            ),
        ];
        if let Some(cause) = control.machine().last_fault() {
            lines.push(format!("last fault: {cause}"));
        }
        lines
    }

    fn trace_lines(&self) -> Vec<String> {
        let log = self.control.log();
        if log.is_empty() {
            return vec!["no transitions recorded".to_string()];
        }
        let mut lines: Vec<String> = log.oldest_first().map(describe_record).collect();
        lines.push(format!(
            "{} shown, {} fault(s) total",
            log.len(),
            log.fault_count()
        ));
        lines
    }

    fn record_output(&mut self, lines: &[String]) -> io::Result<()> {
        let now = self.control.timers().now();
        if let Some(transcript) = self.transcript.as_mut() {
            for line in lines {
                transcript.append_line(now, TranscriptRole::Emulator, line)?;
            }
        }
        Ok(())
    }
}

struct TranscriptLogger {
    writer: BufWriter<std::fs::File>,
}

impl TranscriptLogger {
    fn create(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        let mut logger = Self {
            writer: BufWriter::new(file),
        };
        writeln!(logger.writer, "# Spindle controller emulator transcript")?;
        Ok(logger)
    }

    fn append_line(&mut self, at: u32, role: TranscriptRole, line: &str) -> io::Result<()> {
        writeln!(self.writer, "[{at:>8}ms] {} {line}", role.prefix())?;
        self.writer.flush()
    }
}

enum TranscriptRole {
    Host,
    Emulator,
}

impl TranscriptRole {
    fn prefix(&self) -> &'static str {
        match self {
            TranscriptRole::Host => "HOST>",
            TranscriptRole::Emulator => "EMU <",
        }
    }
}

fn help_lines(topic: Option<&str>) -> Vec<String> {
    match topic {
        None => {
            let mut lines = vec![format!("Commands: {}, exit", help_topic_list())];
            lines.extend(HELP_TOPICS.iter().map(|(_, text)| (*text).to_string()));
            lines
        }
        Some(topic) => match HELP_TOPICS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(topic))
        {
            Some((_, text)) => vec![(*text).to_string()],
            None => vec![format!(
                "ERR unknown topic `{topic}`; topics: {}",
                help_topic_list()
            )],
        },
    }
}

fn help_topic_list() -> String {
    HELP_TOPICS
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(", ")
}

fn usage(command: &str) -> &'static str {
    HELP_TOPICS
        .iter()
        .find(|(name, _)| *name == command)
        .map_or("", |(_, text)| text.split("  -").next().unwrap_or(text).trim_end())
}

fn parse_count(value: &str) -> Result<u32, String> {
    match value.parse::<u32>() {
        Ok(count) if count <= MAX_BATCH => Ok(count),
        Ok(_) => Err(format!("ERR count `{value}` exceeds {MAX_BATCH}")),
        Err(_) => Err(format!("ERR count `{value}` is not a number")),
    }
}

fn parse_level(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "on" | "1" | "true" => Some(true),
        "off" | "0" | "false" => Some(false),
        _ => None,
    }
}

fn on_off(value: bool) -> &'static str {
    if value { "on" } else { "off" }
}

fn describe_outputs(outputs: OutputIntent) -> String {
    format!(
        "outputs light={} inhibit={} start={} direction={} led={}",
        on_off(outputs.light),
        on_off(outputs.inhibit),
        on_off(outputs.start),
        if outputs.direction.is_reverse() { "rev" } else { "fwd" },
        on_off(outputs.status_led)
    )
}

fn describe_record(record: &TransitionRecord) -> String {
    let mut line = format!(
        "#{} t={}ms {} -> {} [{}]",
        record.id,
        record.at,
        record.from,
        record.to,
        record.to.letter()
    );
    if let Some(dwell) = record.dwell_ms {
        line.push_str(&format!(" dwell={dwell}ms"));
    }
    if let Some(cause) = record.fault {
        line.push_str(&format!(" fault: {cause}"));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use spindle_core::machine::SpindleState;

    fn run(session: &mut Session<'_>, commands: &[&str]) -> Vec<String> {
        let mut lines = Vec::new();
        for command in commands {
            lines.extend(session.handle_command(command).unwrap());
        }
        lines
    }

    #[test]
    fn cold_start_settles_into_ready() {
        let timers = TickTimers::new();
        let mut session = Session::new(&timers, None).unwrap();

        let lines = run(&mut session, &["tick 2000", "step"]);
        assert_eq!(session.control().state(), SpindleState::Ready);
        assert!(lines.iter().any(|line| line.contains("cold-start -> estopped")));
        assert!(lines.iter().any(|line| line.contains("estopped -> ready")));
    }

    #[test]
    fn forward_request_runs_through_start_pulse() {
        let timers = TickTimers::new();
        let mut session = Session::new(&timers, None).unwrap();
        run(&mut session, &["tick 2000", "step", "set forward on", "step"]);
        assert_eq!(session.control().state(), SpindleState::FwdStart);

        let status = session.handle_command("status").unwrap();
        assert!(status[2].contains("inhibit=on start=on direction=fwd"));

        run(&mut session, &["tick 500"]);
        assert_eq!(session.control().state(), SpindleState::Fwd);
    }

    #[test]
    fn pressing_estop_while_ready_goes_estopped() {
        let timers = TickTimers::new();
        let mut session = Session::new(&timers, None).unwrap();
        run(&mut session, &["tick 2000", "step", "set estop on", "step"]);
        assert_eq!(session.control().state(), SpindleState::Estopped);
    }

    #[test]
    fn trace_lists_faults() {
        let timers = TickTimers::new();
        let mut session = Session::new(&timers, None).unwrap();
        run(
            &mut session,
            &["tick 2000", "step", "set fwd on", "set rev on", "step"],
        );
        assert_eq!(session.control().state(), SpindleState::Error);

        let trace = session.handle_command("trace").unwrap();
        assert!(trace.iter().any(|line| line.contains("fault: ")));
        assert!(trace.last().unwrap().contains("1 fault(s)"));
    }

    #[test]
    fn malformed_commands_report_errors() {
        let timers = TickTimers::new();
        let mut session = Session::new(&timers, None).unwrap();

        for command in ["bogus", "set light maybe", "set spindle on", "tick", "tick abc", "tick 9999999"] {
            let lines = session.handle_command(command).unwrap();
            assert_eq!(lines.len(), 1, "{command}");
            assert!(lines[0].starts_with("ERR"), "{command}: {}", lines[0]);
        }
        assert_eq!(session.control().state(), SpindleState::ColdStart);
        assert_eq!(timers.now(), 0);
    }

    #[test]
    fn transcript_records_both_sides_with_sim_time() {
        let path = std::env::temp_dir().join(format!(
            "spindle-emulator-transcript-{}.log",
            std::process::id()
        ));
        let timers = TickTimers::new();
        {
            let mut session = Session::new(&timers, Some(&path)).unwrap();
            run(&mut session, &["tick 2000", "status"]);
        }

        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert!(text.starts_with("# Spindle controller emulator transcript"));
        assert!(text.contains("[       0ms] HOST> tick 2000"));
        assert!(text.contains("[    2000ms] EMU < t=2000ms state=estopped"));
        assert!(text.contains("HOST> status"));
    }

    #[test]
    fn help_covers_every_topic() {
        let lines = help_lines(None);
        assert_eq!(lines.len(), HELP_TOPICS.len() + 1);
        assert_eq!(help_lines(Some("TICK")).len(), 1);
        assert!(help_lines(Some("nope"))[0].starts_with("ERR"));
        assert_eq!(usage("step"), "step [n]");
    }
}
