/// Port used when none is given. The original deployment served consoles
/// from the same port as the mission web server, so 80 stays the default.
pub const DEFAULT_PORT: u16 = 80;

pub fn resolve_port(port: Option<u16>) -> u16 {
    port.unwrap_or(DEFAULT_PORT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_port_falls_back_to_the_web_default() {
        assert_eq!(resolve_port(None), 80);
    }

    #[test]
    fn explicit_port_is_kept() {
        assert_eq!(resolve_port(Some(8080)), 8080);
    }
}
