use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Printer kinematics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrinterKind {
    Cartesian,
    CoreXY,
    Delta,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Firmware {
    Klipper,
    Marlin,
    RepRapFirmware,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtruderType {
    DirectDrive,
    Bowden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeType {
    BLTouch,
    Inductive,
    Capacitive,
    Klicky,
    Other,
}

/// Filament material family. Serialized by its upper-case trade name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Material {
    PLA,
    PETG,
    ABS,
    ASA,
    TPU,
    Nylon,
    PC,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
    Auto,
}

/// Build volume in mm.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BuildVolume {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// An optional value per motion axis plus the extruder.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AxisValues {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputShaping {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shaper_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shaper_freq_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shaper_freq_y: Option<f64>,
}

/// Results of calibration runs recorded against a printer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Calibration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation_distance: Option<AxisValues>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure_advance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_shaping: Option<InputShaping>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_current: Option<AxisValues>,
}

/// Hardware description of one printer. Field names match the persisted
/// camelCase JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrinterProfile {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: PrinterKind,
    pub firmware: Firmware,

    pub build_volume: BuildVolume,

    pub extruder_type: ExtruderType,
    pub nozzle_diameter: f64,
    pub max_hotend_temp: f64,

    pub max_speed: f64,
    pub max_acceleration: f64,

    pub has_probe: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe_type: Option<ProbeType>,
    #[serde(rename = "hasTMCDrivers")]
    pub has_tmc_drivers: bool,
    pub has_input_shaping: bool,

    #[serde(default)]
    pub calibration: Calibration,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Printing parameters for one filament.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilamentProfile {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    pub material: Material,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    // Temperatures in °C
    pub nozzle_temp: f64,
    pub bed_temp: f64,

    pub flow_rate: f64,
    pub max_volumetric_speed: f64,
    pub print_speed: f64,

    pub retraction_distance: f64,
    pub retraction_speed: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_hop: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure_advance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooling_fan_speed: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub default_units: Units,
    pub theme: Theme,
    pub auto_save: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            default_units: Units::Metric,
            theme: Theme::Dark,
            auto_save: true,
        }
    }
}

/// A named bundle of printers, filaments and preferences.
///
/// `active_printer_id` / `active_filament_id`, when set, always name an
/// entry of `printers` / `filaments`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_printer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_filament_id: Option<String>,

    #[serde(default)]
    pub printers: Vec<PrinterProfile>,
    #[serde(default)]
    pub filaments: Vec<FilamentProfile>,

    #[serde(default)]
    pub preferences: Preferences,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn printer(&self, id: &str) -> Option<&PrinterProfile> {
        self.printers.iter().find(|p| p.id == id)
    }

    pub fn filament(&self, id: &str) -> Option<&FilamentProfile> {
        self.filaments.iter().find(|f| f.id == id)
    }

    pub fn active_printer(&self) -> Option<&PrinterProfile> {
        self.printer(self.active_printer_id.as_deref()?)
    }

    pub fn active_filament(&self) -> Option<&FilamentProfile> {
        self.filament(self.active_filament_id.as_deref()?)
    }

    /// Clear active pointers that name no existing entry.
    /// Returns true if anything was cleared.
    pub fn repair_active_pointers(&mut self) -> bool {
        let mut repaired = false;
        if self.active_printer_id.is_some() && self.active_printer().is_none() {
            self.active_printer_id = None;
            repaired = true;
        }
        if self.active_filament_id.is_some() && self.active_filament().is_none() {
            self.active_filament_id = None;
            repaired = true;
        }
        repaired
    }
}

/// Fields for a new printer; id and timestamps are assigned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPrinter {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: PrinterKind,
    pub firmware: Firmware,
    pub build_volume: BuildVolume,
    pub extruder_type: ExtruderType,
    pub nozzle_diameter: f64,
    pub max_hotend_temp: f64,
    pub max_speed: f64,
    pub max_acceleration: f64,
    pub has_probe: bool,
    #[serde(default)]
    pub probe_type: Option<ProbeType>,
    #[serde(rename = "hasTMCDrivers")]
    pub has_tmc_drivers: bool,
    pub has_input_shaping: bool,
    #[serde(default)]
    pub calibration: Calibration,
}

impl NewPrinter {
    pub(crate) fn into_profile(self, id: String, now: DateTime<Utc>) -> PrinterProfile {
        PrinterProfile {
            id,
            name: self.name,
            kind: self.kind,
            firmware: self.firmware,
            build_volume: self.build_volume,
            extruder_type: self.extruder_type,
            nozzle_diameter: self.nozzle_diameter,
            max_hotend_temp: self.max_hotend_temp,
            max_speed: self.max_speed,
            max_acceleration: self.max_acceleration,
            has_probe: self.has_probe,
            probe_type: self.probe_type,
            has_tmc_drivers: self.has_tmc_drivers,
            has_input_shaping: self.has_input_shaping,
            calibration: self.calibration,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Fields for a new filament; id and timestamps are assigned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFilament {
    pub name: String,
    #[serde(default)]
    pub brand: Option<String>,
    pub material: Material,
    #[serde(default)]
    pub color: Option<String>,
    pub nozzle_temp: f64,
    pub bed_temp: f64,
    pub flow_rate: f64,
    pub max_volumetric_speed: f64,
    pub print_speed: f64,
    pub retraction_distance: f64,
    pub retraction_speed: f64,
    #[serde(default)]
    pub z_hop: Option<f64>,
    #[serde(default)]
    pub pressure_advance: Option<f64>,
    #[serde(default)]
    pub cooling_fan_speed: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewFilament {
    pub(crate) fn into_profile(self, id: String, now: DateTime<Utc>) -> FilamentProfile {
        FilamentProfile {
            id,
            name: self.name,
            brand: self.brand,
            material: self.material,
            color: self.color,
            nozzle_temp: self.nozzle_temp,
            bed_temp: self.bed_temp,
            flow_rate: self.flow_rate,
            max_volumetric_speed: self.max_volumetric_speed,
            print_speed: self.print_speed,
            retraction_distance: self.retraction_distance,
            retraction_speed: self.retraction_speed,
            z_hop: self.z_hop,
            pressure_advance: self.pressure_advance,
            cooling_fan_speed: self.cooling_fan_speed,
            notes: self.notes,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_printer_wire_names() {
        let printer: PrinterProfile = serde_json::from_value(json!({
            "id": "1700000000000-abc123xyz",
            "name": "Voron 2.4",
            "type": "corexy",
            "firmware": "klipper",
            "buildVolume": { "x": 350, "y": 350, "z": 340 },
            "extruderType": "direct_drive",
            "nozzleDiameter": 0.4,
            "maxHotendTemp": 300,
            "maxSpeed": 500,
            "maxAcceleration": 20000,
            "hasProbe": true,
            "probeType": "klicky",
            "hasTMCDrivers": true,
            "hasInputShaping": true,
            "calibration": {
                "rotationDistance": { "e": 22.67 },
                "inputShaping": { "shaperType": "mzv", "shaperFreqX": 52.4 }
            },
            "createdAt": "2024-03-01T10:00:00.000Z",
            "updatedAt": "2024-03-01T10:00:00.000Z"
        }))
        .unwrap();

        assert_eq!(printer.kind, PrinterKind::CoreXY);
        assert_eq!(printer.extruder_type, ExtruderType::DirectDrive);
        assert_eq!(printer.probe_type, Some(ProbeType::Klicky));
        assert_eq!(
            printer.calibration.rotation_distance.unwrap().e,
            Some(22.67)
        );

        let back = serde_json::to_value(&printer).unwrap();
        assert_eq!(back["type"], "corexy");
        assert_eq!(back["hasTMCDrivers"], true);
        assert_eq!(back["calibration"]["inputShaping"]["shaperType"], "mzv");
        assert!(back["calibration"].get("runCurrent").is_none());
    }

    #[test]
    fn test_filament_material_names() {
        assert_eq!(serde_json::to_value(Material::PETG).unwrap(), "PETG");
        assert_eq!(serde_json::to_value(Material::Nylon).unwrap(), "Nylon");
        assert_eq!(
            serde_json::to_value(Firmware::RepRapFirmware).unwrap(),
            "reprapfirmware"
        );
        assert_eq!(serde_json::to_value(ProbeType::BLTouch).unwrap(), "bltouch");
    }

    #[test]
    fn test_default_preferences_wire_shape() {
        let prefs = serde_json::to_value(Preferences::default()).unwrap();
        assert_eq!(
            prefs,
            json!({ "defaultUnits": "metric", "theme": "dark", "autoSave": true })
        );
    }

    #[test]
    fn test_repair_active_pointers() {
        let now = Utc::now();
        let mut profile = UserProfile {
            id: "p".to_string(),
            name: "Workshop".to_string(),
            active_printer_id: Some("gone".to_string()),
            active_filament_id: None,
            printers: Vec::new(),
            filaments: Vec::new(),
            preferences: Preferences::default(),
            created_at: now,
            updated_at: now,
        };

        assert!(profile.repair_active_pointers());
        assert!(profile.active_printer_id.is_none());
        assert!(!profile.repair_active_pointers());
    }
}
