use lazy_static::lazy_static;
use regex::Regex;

/// Facts extracted from one line of server output.
#[derive(Debug, Clone, PartialEq)]
pub enum LineEvent {
    Tps(f64),
    PlayerJoined(String),
    PlayerLeft(String),
}

#[derive(Clone, Copy)]
enum LineKind {
    Tps,
    Join,
    Leave,
}

lazy_static! {
    /// Tried in order, first match wins.
    static ref LINE_PATTERNS: Vec<(Regex, LineKind)> = [
        // paper / spigot `tps`, the 1m figure may carry a color code or a `*`
        (r"TPS from last 1m, 5m, 15m: [^\d]*(\d+(?:\.\d+)?)", LineKind::Tps),
        // forge `forge tps` overall line
        (r"Overall:.*Mean TPS: (\d+(?:\.\d+)?)", LineKind::Tps),
        (r"(?:^|\]: )(\w+)\[[^\]]*\] logged in", LineKind::Join),
        (r"(?:^|\]: )(\w+) joined the game$", LineKind::Join),
        (r"(?:^|\]: )(\w+) left the game$", LineKind::Leave),
        (r"(?:^|\]: )(\w+) lost connection", LineKind::Leave),
    ]
    .into_iter()
    .map(|(pattern, kind)| {
        (
            Regex::new(pattern).expect("Failed to compile console line pattern"),
            kind,
        )
    })
    .collect();
}

pub const MAX_TPS: f64 = 20.0;

pub fn parse_line(line: &str) -> Option<LineEvent> {
    let line = line.trim_end();
    LINE_PATTERNS.iter().find_map(|(regex, kind)| {
        let captured = regex.captures(line)?.get(1)?.as_str();
        match kind {
            // out of range or unparsable figures are dropped
            LineKind::Tps => captured
                .parse::<f64>()
                .ok()
                .filter(|tps| (0.0..=MAX_TPS).contains(tps))
                .map(LineEvent::Tps),
            LineKind::Join => Some(LineEvent::PlayerJoined(captured.to_string())),
            LineKind::Leave => Some(LineEvent::PlayerLeft(captured.to_string())),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vanilla_join_and_leave() {
        assert_eq!(
            parse_line("[12:00:01] [Server thread/INFO]: Steve joined the game"),
            Some(LineEvent::PlayerJoined("Steve".into()))
        );
        assert_eq!(
            parse_line("[12:00:00] [Server thread/INFO]: Steve[/127.0.0.1:52144] logged in with entity id 183 at (0.5, 64.0, 0.5)"),
            Some(LineEvent::PlayerJoined("Steve".into()))
        );
        assert_eq!(
            parse_line("[12:10:00] [Server thread/INFO]: Alex left the game"),
            Some(LineEvent::PlayerLeft("Alex".into()))
        );
        assert_eq!(
            parse_line("[12:10:00] [Server thread/INFO]: Alex lost connection: Disconnected"),
            Some(LineEvent::PlayerLeft("Alex".into()))
        );
    }

    #[test]
    fn bare_lines_match_too() {
        assert_eq!(
            parse_line("Steve joined the game\n"),
            Some(LineEvent::PlayerJoined("Steve".into()))
        );
    }

    #[test]
    fn chat_cannot_spoof_joins() {
        assert_eq!(
            parse_line("[12:00:01] [Server thread/INFO]: <Steve> Herobrine joined the game"),
            None
        );
    }

    #[test]
    fn paper_tps_line() {
        assert_eq!(
            parse_line("[12:00:00 INFO]: TPS from last 1m, 5m, 15m: §a19.87, §a20.0, §a20.0"),
            Some(LineEvent::Tps(19.87))
        );
        assert_eq!(
            parse_line("[12:00:00 INFO]: TPS from last 1m, 5m, 15m: *20.0, *20.0, *20.0"),
            Some(LineEvent::Tps(20.0))
        );
    }

    #[test]
    fn forge_tps_line() {
        assert_eq!(
            parse_line("[12:00:00] [Server thread/INFO]: Overall: Mean tick time: 12.345 ms. Mean TPS: 18.500"),
            Some(LineEvent::Tps(18.5))
        );
    }

    #[test]
    fn out_of_range_tps_is_discarded() {
        assert_eq!(
            parse_line("TPS from last 1m, 5m, 15m: 25.0, 20.0, 20.0"),
            None
        );
    }

    #[test]
    fn ordinary_output_yields_nothing() {
        assert_eq!(
            parse_line("[12:00:00] [Server thread/INFO]: Done (3.112s)! For help, type \"help\""),
            None
        );
    }
}
