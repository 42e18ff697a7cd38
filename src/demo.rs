//! Built-in demo dashboard driven by the engine simulator.

use crate::config::DEMO_DASHBOARD_NAME;
use crate::dashboard::{DashElement, Dashboard, DashboardError};
use crate::graphics::Color;
use crate::telemetry::EngineSample;

/// Element indices, in insertion order
pub const RPM_GAUGE: usize = 0;
pub const SPEED_GAUGE: usize = 1;
pub const COOLANT_VALUE: usize = 2;
pub const BOOST_GRAPH: usize = 3;
pub const TITLE_LABEL: usize = 4;

/// Two gauges, a value, a graph and a title strip
pub fn demo_dashboard() -> Result<Dashboard, DashboardError> {
    let mut dash = Dashboard::new(DEMO_DASHBOARD_NAME);

    dash.add_element(
        DashElement::gauge(50, 50, 400, 60, Color::GREEN)
            .with_label("RPM")
            .with_range(0.0, 8000.0),
    )?;
    dash.add_element(
        DashElement::gauge(50, 130, 400, 60, Color::BLUE)
            .with_label("Speed")
            .with_range(0.0, 200.0),
    )?;
    dash.add_element(
        DashElement::value(500, 50, 200, 60, Color::CYAN)
            .with_label("Coolant")
            .with_range(60.0, 250.0),
    )?;
    dash.add_element(
        DashElement::graph(50, 250, 650, 200, Color::YELLOW)
            .with_label("Boost")
            .with_range(-15.0, 30.0),
    )?;
    dash.add_element(DashElement::label(50, 500, 650, 50, Color::WHITE).with_label(DEMO_DASHBOARD_NAME))?;

    Ok(dash)
}

/// Push one set of readings into the demo elements
pub fn apply_sample(dash: &mut Dashboard, sample: &EngineSample) -> Result<(), DashboardError> {
    dash.update_value(RPM_GAUGE, sample.rpm)?;
    dash.update_value(SPEED_GAUGE, sample.speed_mph)?;
    dash.update_value(COOLANT_VALUE, sample.coolant_f)?;
    dash.update_value(BOOST_GRAPH, sample.boost_psi)?;
    Ok(())
}
