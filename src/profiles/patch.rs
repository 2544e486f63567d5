//! Partial updates. Every `Some` field overwrites the record's value;
//! `None` leaves it alone. Ids and timestamps are not patchable.

use serde::Deserialize;

use super::types::{
    BuildVolume, Calibration, ExtruderType, FilamentProfile, Firmware, Material, Preferences,
    PrinterKind, PrinterProfile, ProbeType,
};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub preferences: Option<Preferences>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PrinterUpdate {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<PrinterKind>,
    pub firmware: Option<Firmware>,
    pub build_volume: Option<BuildVolume>,
    pub extruder_type: Option<ExtruderType>,
    pub nozzle_diameter: Option<f64>,
    pub max_hotend_temp: Option<f64>,
    pub max_speed: Option<f64>,
    pub max_acceleration: Option<f64>,
    pub has_probe: Option<bool>,
    pub probe_type: Option<ProbeType>,
    #[serde(rename = "hasTMCDrivers")]
    pub has_tmc_drivers: Option<bool>,
    pub has_input_shaping: Option<bool>,
    pub calibration: Option<Calibration>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilamentUpdate {
    pub name: Option<String>,
    pub brand: Option<String>,
    pub material: Option<Material>,
    pub color: Option<String>,
    pub nozzle_temp: Option<f64>,
    pub bed_temp: Option<f64>,
    pub flow_rate: Option<f64>,
    pub max_volumetric_speed: Option<f64>,
    pub print_speed: Option<f64>,
    pub retraction_distance: Option<f64>,
    pub retraction_speed: Option<f64>,
    pub z_hop: Option<f64>,
    pub pressure_advance: Option<f64>,
    pub cooling_fan_speed: Option<f64>,
    pub notes: Option<String>,
}

fn merge<T>(slot: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *slot = v;
    }
}

fn merge_opt<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

impl PrinterUpdate {
    pub fn apply_to(self, printer: &mut PrinterProfile) {
        merge(&mut printer.name, self.name);
        merge(&mut printer.kind, self.kind);
        merge(&mut printer.firmware, self.firmware);
        merge(&mut printer.build_volume, self.build_volume);
        merge(&mut printer.extruder_type, self.extruder_type);
        merge(&mut printer.nozzle_diameter, self.nozzle_diameter);
        merge(&mut printer.max_hotend_temp, self.max_hotend_temp);
        merge(&mut printer.max_speed, self.max_speed);
        merge(&mut printer.max_acceleration, self.max_acceleration);
        merge(&mut printer.has_probe, self.has_probe);
        merge_opt(&mut printer.probe_type, self.probe_type);
        merge(&mut printer.has_tmc_drivers, self.has_tmc_drivers);
        merge(&mut printer.has_input_shaping, self.has_input_shaping);
        merge(&mut printer.calibration, self.calibration);
    }
}

impl FilamentUpdate {
    pub fn apply_to(self, filament: &mut FilamentProfile) {
        merge(&mut filament.name, self.name);
        merge_opt(&mut filament.brand, self.brand);
        merge(&mut filament.material, self.material);
        merge_opt(&mut filament.color, self.color);
        merge(&mut filament.nozzle_temp, self.nozzle_temp);
        merge(&mut filament.bed_temp, self.bed_temp);
        merge(&mut filament.flow_rate, self.flow_rate);
        merge(&mut filament.max_volumetric_speed, self.max_volumetric_speed);
        merge(&mut filament.print_speed, self.print_speed);
        merge(&mut filament.retraction_distance, self.retraction_distance);
        merge(&mut filament.retraction_speed, self.retraction_speed);
        merge_opt(&mut filament.z_hop, self.z_hop);
        merge_opt(&mut filament.pressure_advance, self.pressure_advance);
        merge_opt(&mut filament.cooling_fan_speed, self.cooling_fan_speed);
        merge_opt(&mut filament.notes, self.notes);
    }
}
