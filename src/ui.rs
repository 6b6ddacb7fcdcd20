use crate::{App, Engine};
use rally::timer::Phase;
use rally::util::format_duration;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Gauge, Paragraph, Widget},
};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 1;

fn phase_color(phase: Phase) -> Color {
    match phase {
        Phase::Preparation => Color::Cyan,
        Phase::Work => Color::Green,
        Phase::Rest => Color::Yellow,
        Phase::LongRest => Color::Magenta,
        Phase::Completed => Color::Green,
    }
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let engine = &self.engine;
        let color = phase_color(engine.phase());
        let bold = Style::default().add_modifier(Modifier::BOLD);
        let dim = Style::default().add_modifier(Modifier::DIM);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints(
                [
                    Constraint::Length(2), // title
                    Constraint::Length(2), // phase banner
                    Constraint::Length(2), // countdown
                    Constraint::Length(1), // progress gauge
                    Constraint::Length(2), // round / exercise status
                    Constraint::Min(0),    // exercise checklist
                    Constraint::Length(1), // key help
                ]
                .as_ref(),
            )
            .split(area);

        let channels = format!(
            "sound {} · voice {}",
            if self.cues.sound_enabled() { "on" } else { "off" },
            if self.cues.voice_enabled() { "on" } else { "off" },
        );
        let title = Line::from(vec![
            Span::styled(engine.timer_name().to_string(), bold),
            Span::styled(format!("   {}", channels), dim),
        ]);
        Paragraph::new(title)
            .alignment(Alignment::Center)
            .render(chunks[0], buf);

        let banner = match engine {
            Engine::Interval(timer) => match timer.phase() {
                Phase::Work => format!(
                    "Work — Round {}/{}",
                    timer.round(),
                    timer.config().rounds
                ),
                phase => phase.to_string(),
            },
            Engine::Session(session) => match session.phase() {
                Phase::Work => {
                    let name = session
                        .current_exercise()
                        .map(|e| e.name().to_string())
                        .unwrap_or_default();
                    format!(
                        "Exercise {}/{} — {}",
                        session.exercise_index() + 1,
                        session.exercises().len(),
                        name
                    )
                }
                phase => phase.to_string(),
            },
        };
        Paragraph::new(Span::styled(banner, bold.fg(color)))
            .alignment(Alignment::Center)
            .render(chunks[1], buf);

        Paragraph::new(Span::styled(
            format_duration(engine.remaining()),
            bold.fg(color).add_modifier(Modifier::REVERSED),
        ))
        .alignment(Alignment::Center)
        .render(chunks[2], buf);

        Gauge::default()
            .ratio(engine.progress().clamp(0.0, 1.0))
            .gauge_style(Style::default().fg(color))
            .use_unicode(true)
            .render(chunks[3], buf);

        let status = match engine {
            Engine::Interval(timer) => {
                if timer.phase() == Phase::Completed {
                    match self.last_report {
                        Some(report) => format!(
                            "{}/{} intervals · {} min — saved to history",
                            report.completed, report.total, report.duration_minutes
                        ),
                        None => "Complete!".to_string(),
                    }
                } else {
                    format!(
                        "Interval {}/{} · Round {}/{}",
                        timer.interval(),
                        timer.config().work_intervals,
                        timer.round(),
                        timer.config().rounds
                    )
                }
            }
            Engine::Session(session) => {
                if session.phase() == Phase::Completed {
                    match self.last_report {
                        Some(report) => format!(
                            "{}/{} exercises · {} min — saved to history",
                            report.completed, report.total, report.duration_minutes
                        ),
                        None => "Complete!".to_string(),
                    }
                } else {
                    format!(
                        "{}/{} exercises completed",
                        session.completed_count(),
                        session.exercises().len()
                    )
                }
            }
        };
        Paragraph::new(Span::styled(status, dim))
            .alignment(Alignment::Center)
            .render(chunks[4], buf);

        if let Engine::Session(session) = engine {
            let lines: Vec<Line> = session
                .exercises()
                .iter()
                .enumerate()
                .map(|(idx, exercise)| {
                    let done = session.completed_flags()[idx];
                    let current =
                        idx == session.exercise_index() && session.phase() == Phase::Work;
                    let marker = if done { "[x]" } else { "[ ]" };
                    let style = if current {
                        bold.fg(Color::Green)
                    } else if done {
                        Style::default().fg(Color::Green)
                    } else {
                        dim
                    };
                    Line::from(Span::styled(
                        format!("{} {} ({}s)", marker, exercise.name(), exercise.duration()),
                        style,
                    ))
                })
                .collect();
            Paragraph::new(lines)
                .alignment(Alignment::Center)
                .render(chunks[5], buf);
        }

        let help = if engine.is_running() {
            "space pause · r reset · m sound · v voice · q quit"
        } else {
            "space start · r reset · m sound · v voice · q quit"
        };
        Paragraph::new(Span::styled(help, dim))
            .alignment(Alignment::Center)
            .render(chunks[6], buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rally::config::TimerConfig;
    use rally::cue::CueEmitter;
    use rally::session::{Exercise, SessionTimer};
    use rally::timer::IntervalTimer;
    use ratatui::{backend::TestBackend, Terminal};

    fn render(app: &App) -> String {
        let backend = TestBackend::new(80, 24);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal
            .draw(|f| f.render_widget(app, f.area()))
            .unwrap();
        format!("{:?}", terminal.backend().buffer())
    }

    #[test]
    fn renders_interval_timer_without_panicking() {
        let engine = Engine::Interval(IntervalTimer::new(TimerConfig::default()).unwrap());
        let app = App {
            engine,
            cues: CueEmitter::new(false, false),
            db: None,
            last_report: None,
        };
        let text = render(&app);
        assert!(text.contains("My Workout"));
        assert!(text.contains("Get Ready"));
    }

    #[test]
    fn renders_session_checklist() {
        let exercises = vec![
            Exercise::new("six corners", 30, 10).unwrap(),
            Exercise::new("split steps", 45, 0).unwrap(),
        ];
        let engine = Engine::Session(SessionTimer::new("Footwork", exercises).unwrap());
        let app = App {
            engine,
            cues: CueEmitter::new(false, false),
            db: None,
            last_report: None,
        };
        let text = render(&app);
        assert!(text.contains("six corners"));
        assert!(text.contains("split steps"));
    }
}
