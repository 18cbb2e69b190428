//! ANSI color helpers for CLI output.

fn paint(sgr: &str, s: &str) -> String {
    format!("\x1b[{}m{}\x1b[0m", sgr, s)
}

/// Errors.
pub fn red(s: &str) -> String {
    paint("31", s)
}

/// Warnings.
pub fn yellow(s: &str) -> String {
    paint("33", s)
}

/// Packet fields and node addresses in network traces.
pub fn magenta(s: &str) -> String {
    paint("35", s)
}

/// Output values that are not ASCII text.
pub fn bold(s: &str) -> String {
    paint("1", s)
}

/// Secondary diagnostics on stderr.
pub fn gray(s: &str) -> String {
    paint("90", s)
}

/// A status label (right-aligned, green, bold).
pub fn status_label(label: &str) -> String {
    paint("1;32", &format!("{:>12}", label))
}
