use crate::config::AdapterConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Device-side auto-stop window for a continuous move. A safety fallback:
/// the camera firmware halts motion once this elapses without a follow-up
/// command, even if no explicit stop arrives.
pub const CONTINUOUS_MOVE_TIMEOUT: Duration = Duration::from_secs(3);

/// Inbound control channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlChannel {
    Joystick,
    Buttons,
}

impl ControlChannel {
    /// Case-insensitive match against the wire channel name. `None` for
    /// anything unrecognized; the dispatcher ignores those events.
    pub fn parse(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("joystick") {
            Some(ControlChannel::Joystick)
        } else if name.eq_ignore_ascii_case("buttons") {
            Some(ControlChannel::Buttons)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlAxes {
    #[serde(default)]
    pub linear_x: f64,
    #[serde(default)]
    pub angular_z: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ButtonInput {
    pub name: String,
    pub pressed: bool,
}

/// One inbound platform control message. Transient; button order is
/// preserved from the input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlEvent {
    pub channel: String,
    #[serde(default)]
    pub axes: ControlAxes,
    #[serde(default)]
    pub buttons: Vec<ButtonInput>,
}

/// Motion axis a continuous move applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionAxis {
    PanTilt,
    Zoom,
}

/// Normalized velocity; `y` is unused for zoom moves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Velocity {
    pub x: f64,
    pub y: f64,
}

/// A device motion command derived from one control event.
#[derive(Debug, Clone, PartialEq)]
pub enum MotionCommand {
    Move {
        axis: MotionAxis,
        velocity: Velocity,
        timeout: Duration,
    },
    Stop,
}

enum ButtonAction {
    ZoomIn,
    ZoomOut,
    Unrecognized,
}

// Button names are matched exactly, as the platform reports them.
fn button_action(name: &str) -> ButtonAction {
    match name {
        "zoom in" => ButtonAction::ZoomIn,
        "zoom out" => ButtonAction::ZoomOut,
        _ => ButtonAction::Unrecognized,
    }
}

/// Translate one control event into an ordered sequence of motion commands.
///
/// Pure: no session access, no I/O. Ordering matters for button events —
/// the last command to reach the device wins.
pub fn translate(
    channel: ControlChannel,
    event: &ControlEvent,
    config: &AdapterConfig,
) -> Vec<MotionCommand> {
    match channel {
        ControlChannel::Joystick => translate_joystick(&event.axes, config),
        ControlChannel::Buttons => translate_buttons(&event.buttons, config),
    }
}

fn translate_joystick(axes: &ControlAxes, config: &AdapterConfig) -> Vec<MotionCommand> {
    if axes.linear_x != 0.0 || axes.angular_z != 0.0 {
        vec![MotionCommand::Move {
            axis: MotionAxis::PanTilt,
            velocity: Velocity {
                x: config.pan_rate * axes.angular_z,
                y: config.tilt_rate * axes.linear_x,
            },
            timeout: CONTINUOUS_MOVE_TIMEOUT,
        }]
    } else {
        vec![MotionCommand::Stop]
    }
}

fn translate_buttons(buttons: &[ButtonInput], config: &AdapterConfig) -> Vec<MotionCommand> {
    let mut commands = Vec::new();

    for button in buttons {
        if button.pressed {
            match button_action(&button.name) {
                ButtonAction::ZoomIn => commands.push(zoom(config.zoom_rate)),
                ButtonAction::ZoomOut => commands.push(zoom(-config.zoom_rate)),
                ButtonAction::Unrecognized => {
                    debug!(button = %button.name, "Ignoring unrecognized button");
                }
            }
        } else {
            // Any released button stops motion; with mixed states the last
            // entry in input order wins at the device.
            commands.push(MotionCommand::Stop);
        }
    }

    commands
}

fn zoom(rate: f64) -> MotionCommand {
    MotionCommand::Move {
        axis: MotionAxis::Zoom,
        velocity: Velocity { x: rate, y: 0.0 },
        timeout: CONTINUOUS_MOVE_TIMEOUT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(channel: &str, linear_x: f64, angular_z: f64, buttons: &[(&str, bool)]) -> ControlEvent {
        ControlEvent {
            channel: channel.to_string(),
            axes: ControlAxes { linear_x, angular_z },
            buttons: buttons
                .iter()
                .map(|(name, pressed)| ButtonInput {
                    name: name.to_string(),
                    pressed: *pressed,
                })
                .collect(),
        }
    }

    #[test]
    fn test_channel_parse_is_case_insensitive() {
        assert_eq!(ControlChannel::parse("Joystick"), Some(ControlChannel::Joystick));
        assert_eq!(ControlChannel::parse("BUTTONS"), Some(ControlChannel::Buttons));
        assert_eq!(ControlChannel::parse("gamepad"), None);
    }

    #[test]
    fn test_zero_joystick_produces_stop() {
        let cfg = AdapterConfig::default();
        let commands = translate(
            ControlChannel::Joystick,
            &event("joystick", 0.0, 0.0, &[]),
            &cfg,
        );
        assert_eq!(commands, vec![MotionCommand::Stop]);
    }

    #[test]
    fn test_joystick_scaling_law() {
        let cfg = AdapterConfig {
            pan_rate: 0.5,
            tilt_rate: 2.0,
            ..AdapterConfig::default()
        };
        let commands = translate(
            ControlChannel::Joystick,
            &event("joystick", -0.3, 0.8, &[]),
            &cfg,
        );

        match &commands[..] {
            [MotionCommand::Move {
                axis: MotionAxis::PanTilt,
                velocity,
                timeout,
            }] => {
                assert_eq!(velocity.x, 0.5 * 0.8);
                assert_eq!(velocity.y, 2.0 * -0.3);
                assert_eq!(*timeout, CONTINUOUS_MOVE_TIMEOUT);
            }
            other => panic!("unexpected commands: {:?}", other),
        }
    }

    #[test]
    fn test_single_axis_still_moves() {
        let cfg = AdapterConfig::default();
        let commands = translate(
            ControlChannel::Joystick,
            &event("joystick", 0.4, 0.0, &[]),
            &cfg,
        );
        assert!(matches!(commands[..], [MotionCommand::Move { .. }]));
    }

    #[test]
    fn test_zoom_in_button() {
        let cfg = AdapterConfig::default();
        let commands = translate(
            ControlChannel::Buttons,
            &event("buttons", 0.0, 0.0, &[("zoom in", true)]),
            &cfg,
        );
        assert_eq!(
            commands,
            vec![MotionCommand::Move {
                axis: MotionAxis::Zoom,
                velocity: Velocity { x: cfg.zoom_rate, y: 0.0 },
                timeout: CONTINUOUS_MOVE_TIMEOUT,
            }]
        );
    }

    #[test]
    fn test_zoom_out_button_negates_rate() {
        let cfg = AdapterConfig::default();
        let commands = translate(
            ControlChannel::Buttons,
            &event("buttons", 0.0, 0.0, &[("zoom out", true)]),
            &cfg,
        );
        match &commands[..] {
            [MotionCommand::Move { velocity, .. }] => assert_eq!(velocity.x, -cfg.zoom_rate),
            other => panic!("unexpected commands: {:?}", other),
        }
    }

    #[test]
    fn test_released_button_produces_stop() {
        let cfg = AdapterConfig::default();
        let commands = translate(
            ControlChannel::Buttons,
            &event("buttons", 0.0, 0.0, &[("zoom in", false)]),
            &cfg,
        );
        assert_eq!(commands, vec![MotionCommand::Stop]);
    }

    #[test]
    fn test_mixed_button_states_preserve_order() {
        let cfg = AdapterConfig::default();
        let commands = translate(
            ControlChannel::Buttons,
            &event(
                "buttons",
                0.0,
                0.0,
                &[("zoom in", true), ("zoom out", false)],
            ),
            &cfg,
        );
        // Move first, then the release's Stop — the Stop wins downstream.
        assert_eq!(commands.len(), 2);
        assert!(matches!(commands[0], MotionCommand::Move { .. }));
        assert_eq!(commands[1], MotionCommand::Stop);
    }

    #[test]
    fn test_unrecognized_pressed_button_is_ignored() {
        let cfg = AdapterConfig::default();
        let commands = translate(
            ControlChannel::Buttons,
            &event("buttons", 0.0, 0.0, &[("focus near", true)]),
            &cfg,
        );
        assert!(commands.is_empty());
    }
}
