//! Text rendering of dashboard snapshots.

use std::fmt::Write;

use chrono::{DateTime, TimeDelta, Utc};
use citycast_core::{
    ForecastSample, SearchState, Units,
    icon::{icon_glyph, icon_url},
    model::{compass_arrow, compass_point},
};

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";
const PROMPT: &str = "> ";

// cursor save/restore, one line up, erase line
const SAVE_CURSOR: &str = "\x1b[s";
const RESTORE_CURSOR: &str = "\x1b[u";
const LINE_UP: &str = "\x1b[1A";
const ERASE_LINE: &str = "\x1b[2K";

const BARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

pub fn dashboard(state: &SearchState, now: DateTime<Utc>) -> String {
    body(state, now, true)
}

/// Full interactive screen: the dashboard, the clock on its own line and the prompt below it.
///
/// The clock line sits right above the prompt so [`tick`] can rewrite it in place.
pub fn screen(state: &SearchState, now: DateTime<Utc>) -> String {
    let clock = state.local_time.as_deref().map(clock_line).unwrap_or_default();
    format!("{CLEAR_SCREEN}{}\n{clock}\n{PROMPT}", body(state, now, false))
}

/// Rewrite the clock line of the last [`screen`], leaving the cursor and typed input alone.
pub fn tick(time: &str) -> String {
    format!(
        "{SAVE_CURSOR}{LINE_UP}\r{ERASE_LINE}{}{RESTORE_CURSOR}",
        clock_line(time)
    )
}

fn body(state: &SearchState, now: DateTime<Utc>, with_clock: bool) -> String {
    let mut out = String::new();

    if let Some(place) = &state.query_in_flight {
        let _ = writeln!(out, "Searching for {place}...");
    }
    if let Some(notice) = &state.notice {
        let _ = writeln!(out, "! {notice}");
    }

    match &state.conditions {
        Some(c) => {
            let _ = writeln!(out, "{} {}", icon_glyph(&c.icon), c.location_name);
            let _ = writeln!(out, "  {}", icon_url(&c.icon));
            let _ = writeln!(
                out,
                "  {}{}   humidity {}%",
                c.temperature,
                c.units.temperature_suffix(),
                c.humidity_pct
            );
            let _ = writeln!(out, "  wind {}", wind(c.wind_speed, c.wind_direction_deg, c.units));
            if let Some(offset) = state.clock_offset {
                let _ = writeln!(out, "  {}", date_line(now, offset));
            }
            if let Some(time) = state.local_time.as_deref().filter(|_| with_clock) {
                let _ = writeln!(out, "  {}", clock_line(time));
            }
            if let Some(sun) = &state.sun_times {
                let _ = writeln!(out, "  sunrise {}   sunset {}", sun.sunrise, sun.sunset);
            }
        }
        None => {
            let _ = writeln!(out, "No current conditions");
        }
    }

    if !state.forecast.is_empty() {
        let units = state.conditions.as_ref().map(|c| c.units).unwrap_or_default();
        let _ = writeln!(out);
        out.push_str(&forecast_charts(&state.forecast, units));
    }

    if !state.images.is_empty() {
        let _ = writeln!(out, "\nPhotos");
        for image in &state.images {
            match &image.description {
                Some(alt) => {
                    let _ = writeln!(out, "  {} ({alt})", image.url);
                }
                None => {
                    let _ = writeln!(out, "  {}", image.url);
                }
            }
        }
    }

    out
}

pub fn clock_line(time: &str) -> String {
    format!("local time {time}")
}

fn date_line(now: DateTime<Utc>, offset_seconds: i32) -> String {
    (now + TimeDelta::seconds(i64::from(offset_seconds)))
        .format("%A, %-d %B %Y")
        .to_string()
}

fn wind(speed: f64, direction: Option<f64>, units: Units) -> String {
    match direction {
        Some(deg) => format!(
            "{speed:.1} {} {} {} ({deg:.0}°)",
            units.speed_suffix(),
            compass_arrow(deg),
            compass_point(deg)
        ),
        None => format!("{speed:.1} {}", units.speed_suffix()),
    }
}

fn forecast_charts(samples: &[ForecastSample], units: Units) -> String {
    let labels: Vec<&str> = samples.iter().map(|s| s.hour_label.as_str()).collect();
    let temperature: Vec<f64> = samples.iter().map(|s| f64::from(s.temperature)).collect();
    let humidity: Vec<f64> = samples.iter().map(|s| f64::from(s.humidity_pct)).collect();
    let wind: Vec<f64> = samples.iter().map(|s| s.wind_speed).collect();

    let mut out = String::new();
    out.push_str(&chart("Temperature", &temperature, units.temperature_suffix()));
    out.push_str(&chart("Humidity", &humidity, "%"));
    out.push_str(&chart("Wind", &wind, units.speed_suffix()));
    let _ = writeln!(out, "  {} .. {}", labels.first().unwrap_or(&""), labels.last().unwrap_or(&""));
    out
}

/// One auto-scaled block chart line with its axis range.
pub fn chart(title: &str, values: &[f64], unit: &str) -> String {
    let Some((min, max)) = axis_range(values) else {
        return format!("{title:<12} (no data)\n");
    };

    let bars: String = values.iter().map(|v| bar(*v, min, max)).collect();
    format!("{title:<12} {bars}  {min:.0}..{max:.0}{unit}\n")
}

/// Axis bounds; a flat series gets one unit of headroom on each side.
fn axis_range(values: &[f64]) -> Option<(f64, f64)> {
    let finite = values.iter().copied().filter(|v| v.is_finite());
    let (min, max) = finite.fold(None, |acc: Option<(f64, f64)>, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })?;

    if (max - min).abs() < f64::EPSILON {
        Some((min - 1.0, max + 1.0))
    } else {
        Some((min, max))
    }
}

fn bar(value: f64, min: f64, max: f64) -> char {
    if !value.is_finite() {
        return ' ';
    }
    let ratio = ((value - min) / (max - min)).clamp(0.0, 1.0);
    BARS[(ratio * (BARS.len() - 1) as f64).round() as usize]
}

#[cfg(test)]
mod tests {
    use super::*;
    use citycast_core::{CityImage, CurrentConditions, Notice, SunTimes};

    fn new_york_state() -> SearchState {
        SearchState {
            conditions: Some(CurrentConditions {
                location_name: "New York".into(),
                temperature: 21,
                humidity_pct: 55,
                wind_speed: 3.1,
                wind_direction_deg: Some(270.0),
                icon: "01d".into(),
                utc_offset_seconds: -14_400,
                sunrise_epoch: 1_700_000_000,
                sunset_epoch: 1_700_040_000,
                units: Units::Metric,
            }),
            clock_offset: Some(-14_400),
            sun_times: Some(SunTimes { sunrise: "18:13".into(), sunset: "05:20".into() }),
            local_time: Some("18:13:20".into()),
            forecast: vec![
                ForecastSample { hour_label: "0:00".into(), temperature: 12, humidity_pct: 70, wind_speed: 4.2 },
                ForecastSample { hour_label: "3:00".into(), temperature: 11, humidity_pct: 74, wind_speed: 3.8 },
            ],
            images: vec![CityImage::new("https://images.example/0.jpg")],
            generation: 1,
            revision: 4,
            ..Default::default()
        }
    }

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).expect("epoch")
    }

    #[test]
    fn renders_every_region() {
        let text = dashboard(&new_york_state(), now());

        assert!(text.contains("☀️ New York"));
        assert!(text.contains("https://openweathermap.org/img/wn/01d@2x.png"));
        assert!(text.contains("21°C   humidity 55%"));
        assert!(text.contains("wind 3.1 m/s → W (270°)"));
        assert!(text.contains("Tuesday, 14 November 2023"));
        assert!(text.contains("local time 18:13:20"));
        assert!(text.contains("sunrise 18:13   sunset 05:20"));
        assert!(text.contains("Temperature"));
        assert!(text.contains("0:00 .. 3:00"));
        assert!(text.contains("https://images.example/0.jpg"));
    }

    #[test]
    fn renders_notice_without_conditions() {
        let state = SearchState {
            notice: Some(Notice::NotFound("Zzzznotacity".into())),
            ..Default::default()
        };
        let text = dashboard(&state, now());

        assert!(text.contains("! City 'Zzzznotacity' not found"));
        assert!(text.contains("No current conditions"));
        assert!(!text.contains("Photos"));
    }

    /// Minimal terminal: printable text, `\r`, `\n` and the escape sequences the dashboard emits.
    #[derive(Default)]
    struct Terminal {
        lines: Vec<Vec<char>>,
        row: usize,
        col: usize,
        saved: (usize, usize),
    }

    impl Terminal {
        fn write(&mut self, text: &str) {
            let mut chars = text.chars().peekable();
            while let Some(c) = chars.next() {
                match c {
                    '\x1b' => {
                        assert_eq!(chars.next(), Some('['));
                        let mut arg = String::new();
                        let cmd = loop {
                            match chars.next().expect("unterminated escape") {
                                d if d.is_ascii_digit() => arg.push(d),
                                cmd => break cmd,
                            }
                        };
                        let n: usize = arg.parse().unwrap_or(1);
                        match cmd {
                            'J' => self.lines.clear(),
                            'H' => (self.row, self.col) = (0, 0),
                            's' => self.saved = (self.row, self.col),
                            'u' => (self.row, self.col) = self.saved,
                            'A' => self.row = self.row.saturating_sub(n),
                            'K' => self.line().clear(),
                            other => panic!("unexpected escape {other}"),
                        }
                    }
                    '\r' => self.col = 0,
                    '\n' => {
                        self.row += 1;
                        self.col = 0;
                    }
                    c => {
                        let col = self.col;
                        let line = self.line();
                        if line.len() <= col {
                            line.resize(col, ' ');
                            line.push(c);
                        } else {
                            line[col] = c;
                        }
                        self.col += 1;
                    }
                }
            }
        }

        fn line(&mut self) -> &mut Vec<char> {
            if self.lines.len() <= self.row {
                self.lines.resize(self.row + 1, Vec::new());
            }
            &mut self.lines[self.row]
        }

        fn visible(&self) -> Vec<String> {
            self.lines.iter().map(|l| l.iter().collect::<String>().trim_end().to_string()).collect()
        }
    }

    #[test]
    fn screen_puts_the_clock_above_the_prompt() {
        let text = screen(&new_york_state(), now());

        assert!(text.starts_with(CLEAR_SCREEN));
        assert!(text.ends_with("\nlocal time 18:13:20\n> "));
        assert_eq!(text.matches("local time").count(), 1);
    }

    #[test]
    fn ticks_rewrite_one_clock_line_and_keep_typed_input() {
        let mut term = Terminal::default();
        term.write(&screen(&new_york_state(), now()));
        term.write("Par");

        for time in ["18:13:21", "18:13:22", "18:13:23"] {
            term.write(&tick(time));
        }
        term.write("is");

        let lines = term.visible();
        let clocks: Vec<_> = lines.iter().filter(|l| l.contains("local time")).collect();
        assert_eq!(clocks, ["local time 18:13:23"]);
        assert_eq!(lines.last().map(String::as_str), Some("> Paris"));
        assert_eq!(lines[lines.len() - 2], "local time 18:13:23");
    }

    #[test]
    fn screen_without_conditions_keeps_an_empty_clock_slot() {
        let text = screen(&SearchState::default(), now());
        assert!(text.ends_with("No current conditions\n\n\n> "));
    }

    #[test]
    fn chart_scales_to_the_series() {
        assert_eq!(chart("T", &[0.0, 5.0, 10.0], "°C"), format!("{:<12} ▁▅█  0..10°C\n", "T"));
    }

    #[test]
    fn flat_series_sits_mid_axis() {
        assert_eq!(axis_range(&[4.0, 4.0]), Some((3.0, 5.0)));
        assert_eq!(chart("W", &[4.0, 4.0], "m/s"), format!("{:<12} ▅▅  3..5m/s\n", "W"));
    }

    #[test]
    fn empty_series_has_no_axis() {
        assert_eq!(axis_range(&[]), None);
        assert!(chart("H", &[], "%").contains("(no data)"));
    }
}
