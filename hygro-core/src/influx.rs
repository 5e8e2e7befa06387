//! InfluxDB line-protocol preview.
//!
//! The bridge forwards each reading as one UDP line-protocol record. These
//! helpers render the same line on the client so the operator can check
//! measurement and tag settings before storing them.

use crate::device::{DeviceConfig, SensorAddr, SensorClient};

/// Escape a tag value: drop non-printable ASCII, backslash `,`, ` ` and `=`.
pub fn escape_tag(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if !(c.is_ascii_graphic() || c == ' ') {
            continue;
        }
        if matches!(c, ',' | ' ' | '=') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Render one record as the device would send it.
pub fn report_line(
    db: &str,
    addr: SensorAddr,
    name: &str,
    prefix: &str,
    temperature: f32,
    humidity: f32,
) -> String {
    let spacer = if prefix.is_empty() { "" } else { "," };
    format!(
        "{},type=bt,id={},name={}{}{} temperature={:.1},humidity={:.1}",
        db,
        addr,
        escape_tag(name),
        spacer,
        prefix,
        temperature,
        humidity
    )
}

/// Preview for a configured sensor; `None` until both readings are known.
pub fn preview(config: &DeviceConfig, sensor: &SensorClient) -> Option<String> {
    let (t, h) = sensor.reading()?;
    Some(report_line(
        &config.ifx_db,
        sensor.addr,
        &sensor.name,
        &config.ifx_pfx,
        t,
        h,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_separators_and_drops_control_chars() {
        assert_eq!(escape_tag("living room"), "living\\ room");
        assert_eq!(escape_tag("a,b=c"), "a\\,b\\=c");
        assert_eq!(escape_tag("tab\there\n"), "tabhere");
    }

    #[test]
    fn line_without_prefix() {
        let addr = SensorAddr::new(0xa4c1_3800_0001).unwrap();
        assert_eq!(
            report_line("climate", addr, "kitchen", "", 21.46, 40.0),
            "climate,type=bt,id=a4c138000001,name=kitchen temperature=21.5,humidity=40.0"
        );
    }

    #[test]
    fn line_with_prefix_and_escaped_name() {
        let addr = SensorAddr::new(0x2).unwrap();
        assert_eq!(
            report_line("m", addr, "back yard", "site=home", -3.0, 88.24),
            "m,type=bt,id=000000000002,name=back\\ yard,site=home temperature=-3.0,humidity=88.2"
        );
    }

    #[test]
    fn preview_requires_both_readings() {
        let mut config = DeviceConfig::default();
        config.ifx_db = "climate".to_string();
        config
            .add_sensor(SensorAddr::new(1).unwrap(), "one")
            .unwrap();
        assert!(preview(&config, &config.ifx_clients[0]).is_none());
        config.ifx_clients[0].t = Some(20.0);
        assert!(preview(&config, &config.ifx_clients[0]).is_none());
        config.ifx_clients[0].h = Some(30.0);
        assert!(preview(&config, &config.ifx_clients[0]).is_some());
    }
}
