//! Closed-form calibration formulas used by the calculators.
//!
//! All inputs and outputs are plain `f64` in the units the calculators
//! display (mm, mm/s, mm³/s, A, Hz). Division by a zero input yields an
//! infinite or NaN result rather than an error; the UI validates inputs.

use std::f64::consts::{PI, SQRT_2};

use serde::Serialize;

/// TMC `run_current` (RMS) from a motor's rated peak current.
pub fn rms_current(peak_current: f64) -> f64 {
    peak_current / SQRT_2
}

/// Extruder `rotation_distance` from the old Marlin E-steps value.
pub fn extruder_from_esteps(full_steps: f64, microsteps: f64, e_steps: f64) -> f64 {
    (full_steps * microsteps) / e_steps
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtruderMeasurement {
    pub actual_extruded: f64,
    pub new_rotation: f64,
}

/// Corrected `rotation_distance` from a mark-and-measure extrusion test.
/// Marks are distances from the extruder inlet before and after extruding.
pub fn extruder_from_measurement(
    prev_rotation: f64,
    initial_mark: f64,
    requested_extrude: f64,
    subsequent_mark: f64,
) -> ExtruderMeasurement {
    let actual_extruded = initial_mark - subsequent_mark;
    ExtruderMeasurement {
        actual_extruded,
        new_rotation: (prev_rotation * actual_extruded) / requested_extrude,
    }
}

/// OrcaSlicer flow-rate pass: slide value is a percentage adjustment.
pub fn orca_flow_pass(old_flow: f64, slide_value: f64) -> f64 {
    old_flow * (1.0 + slide_value / 100.0)
}

/// OrcaSlicer "YOLO" flow test: slide value is added directly.
pub fn orca_flow_yolo(old_flow: f64, slide_value: f64) -> f64 {
    old_flow + slide_value
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WallFlow {
    pub expected: f64,
    pub average: f64,
    pub flow: f64,
}

/// Flow percentage from measured single-wall thickness.
/// Returns `None` when there are no measurements.
pub fn flow_from_wall(
    line_width: f64,
    perimeters: f64,
    measurements: &[f64],
) -> Option<WallFlow> {
    if measurements.is_empty() {
        return None;
    }
    let expected = line_width * perimeters;
    let average = measurements.iter().sum::<f64>() / measurements.len() as f64;
    Some(WallFlow {
        expected,
        average,
        flow: 100.0 * (expected / average),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumetricLimit {
    pub max_flow: f64,
    pub recommended_flow: f64,
}

/// Max volumetric speed from the OrcaSlicer tower; recommends 90 % of it.
pub fn volumetric_orca(start_flow: f64, measured_height: f64, step: f64) -> VolumetricLimit {
    let max_flow = start_flow + measured_height * step;
    VolumetricLimit {
        max_flow,
        recommended_flow: max_flow * 0.9,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EllisVolumetric {
    pub extrusion_speed: f64,
    pub max_volumetric: f64,
}

/// Max volumetric speed from the highest clean feed rate (F, mm/min).
pub fn volumetric_ellis(f_value: f64, filament_diameter: f64) -> EllisVolumetric {
    let extrusion_speed = f_value / 60.0;
    let radius = filament_diameter / 2.0;
    EllisVolumetric {
        extrusion_speed,
        max_volumetric: PI * radius * radius * extrusion_speed,
    }
}

/// Pressure advance read off a tuning tower.
pub fn pressure_advance(start: f64, measured_height: f64, factor: f64) -> f64 {
    start + measured_height * factor
}

/// Ringing frequency in Hz from the ringing-tower ring spacing.
pub fn input_shaping_freq(print_speed: f64, rings: f64, measurement: f64) -> f64 {
    (rings * print_speed) / measurement
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtrusionRateSmoothing {
    pub max: f64,
    pub min_recommended: f64,
    pub max_recommended: f64,
}

/// Extrusion rate smoothing ceiling, recommending 60-80 % of it.
pub fn extrusion_rate_smoothing(
    accel: f64,
    line_width: f64,
    layer_height: f64,
) -> ExtrusionRateSmoothing {
    let max = accel * line_width * layer_height;
    ExtrusionRateSmoothing {
        max,
        min_recommended: max * 0.6,
        max_recommended: max * 0.8,
    }
}

/// Lead screw `rotation_distance`: pitch times number of starts.
pub fn lead_screw_rotation(pitch: f64, starts: f64) -> f64 {
    pitch * starts
}

/// Belt axis `rotation_distance`: belt pitch times pulley teeth.
pub fn belt_rotation(belt_pitch: f64, pulley_teeth: f64) -> f64 {
    belt_pitch * pulley_teeth
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProbeOffset {
    pub x: f64,
    pub y: f64,
}

/// Probe XY offset relative to the nozzle.
pub fn probe_offset(probe_x: f64, probe_y: f64, nozzle_x: f64, nozzle_y: f64) -> ProbeOffset {
    ProbeOffset {
        x: nozzle_x - probe_x,
        y: nozzle_y - probe_y,
    }
}

/// Highest print speed a volumetric limit allows for a given line.
pub fn max_print_speed(max_volumetric: f64, layer_height: f64, line_width: f64) -> f64 {
    max_volumetric / (layer_height * line_width)
}

/// Line width as a percentage of nozzle diameter.
pub fn line_width(nozzle_diameter: f64, percentage: f64) -> f64 {
    nozzle_diameter * (percentage / 100.0)
}
