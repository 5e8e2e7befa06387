//! SynthBrute theme and color utilities.

use hygro_core::Severity;
use ratatui::style::Color;

#[derive(Debug, Clone)]
pub struct SynthBruteTheme {
    pub bg: Color,
    pub bg_highlight: Color,
    pub primary: Color,
    pub primary_dim: Color,
    pub secondary: Color,
    pub tertiary: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub info: Color,
    pub text: Color,
    pub text_dim: Color,
    pub border: Color,
}

impl SynthBruteTheme {
    pub fn synthbrute() -> Self {
        Self {
            bg: Color::Rgb(10, 10, 10),
            bg_highlight: Color::Rgb(42, 42, 42),
            primary: Color::Rgb(0, 255, 255),
            primary_dim: Color::Rgb(0, 136, 136),
            secondary: Color::Rgb(255, 0, 255),
            tertiary: Color::Rgb(255, 255, 0),
            success: Color::Rgb(0, 255, 0),
            warning: Color::Rgb(255, 170, 0),
            error: Color::Rgb(255, 0, 0),
            info: Color::Rgb(0, 255, 255),
            text: Color::Rgb(255, 255, 255),
            text_dim: Color::Rgb(136, 136, 136),
            border: Color::Rgb(68, 68, 68),
        }
    }
}

impl Default for SynthBruteTheme {
    fn default() -> Self {
        Self::synthbrute()
    }
}

pub fn severity_color(severity: Severity, theme: &SynthBruteTheme) -> Color {
    match severity {
        Severity::Ok => theme.success,
        Severity::Warn => theme.warning,
        Severity::Err => theme.error,
        Severity::Busy => theme.info,
        Severity::None => theme.text,
    }
}

/// Colour for a temperature reading in °C.
pub fn temperature_color(celsius: f32, theme: &SynthBruteTheme) -> Color {
    if celsius < 10.0 {
        theme.info
    } else if celsius < 26.0 {
        theme.success
    } else if celsius < 32.0 {
        theme.warning
    } else {
        theme.error
    }
}

/// Colour for a relative humidity reading in %.
pub fn humidity_color(percent: f32, theme: &SynthBruteTheme) -> Color {
    if (30.0..=60.0).contains(&percent) {
        theme.success
    } else if (20.0..=70.0).contains(&percent) {
        theme.warning
    } else {
        theme.error
    }
}
