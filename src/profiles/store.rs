use serde_json::Value;
use tracing::{debug, info, warn};

use super::id::{generate_id, now};
use super::patch::{FilamentUpdate, PrinterUpdate, ProfileUpdate};
use super::types::{
    FilamentProfile, NewFilament, NewPrinter, Preferences, PrinterProfile, UserProfile,
};
use crate::storage::{KeyValueStorage, Persistence, ACTIVE_PROFILE_KEY, USER_PROFILES_KEY};
use crate::transfer::{parse_section, ProfileExport, ProfilesExport, VersionPolicy, EXPORT_VERSION};

/// Name of the profile synthesized for an empty store.
pub const DEFAULT_PROFILE_NAME: &str = "Default Profile";

/// User profiles with their printers and filaments, plus the pointer to the
/// current profile.
///
/// Printer and filament operations act on the current profile. Every
/// mutation persists the whole profile list (and the current profile id)
/// before returning. Lookups by an unknown id are silent no-ops.
pub struct ProfileStore<S> {
    profiles: Vec<UserProfile>,
    current_id: Option<String>,
    persistence: Persistence<S>,
}

impl<S: KeyValueStorage> ProfileStore<S> {
    /// Load profiles from `storage`.
    ///
    /// An empty store gets a single "Default Profile", which becomes current
    /// and is persisted. Otherwise the current profile is the one named by
    /// the persisted active id, or none if it matches nothing.
    ///
    /// Stored entries that cannot be decoded are skipped. If that leaves
    /// nothing, the default profile is kept in memory only and the stored
    /// list is left as it was.
    pub fn load(storage: S) -> Self {
        let persistence = Persistence::new(storage);
        let (mut profiles, intact) = match persistence.load(USER_PROFILES_KEY) {
            Some(raw) => decode_profiles(&raw),
            None => (Vec::new(), true),
        };
        for profile in &mut profiles {
            if profile.repair_active_pointers() {
                warn!("Cleared dangling active selection in profile {}", profile.id);
            }
        }

        let current_id = persistence
            .load(ACTIVE_PROFILE_KEY)
            .filter(|id| profiles.iter().any(|p| p.id == *id));

        let mut store = Self {
            profiles,
            current_id,
            persistence,
        };

        if store.profiles.is_empty() {
            if intact {
                store.create_profile(DEFAULT_PROFILE_NAME);
            } else {
                warn!("No readable stored profiles; using an unsaved default profile");
                let profile = new_profile(DEFAULT_PROFILE_NAME);
                store.current_id = Some(profile.id.clone());
                store.profiles.push(profile);
            }
        }

        info!(
            "Loaded {} profiles (current: {})",
            store.profiles.len(),
            store.current_id.as_deref().unwrap_or("<none>")
        );
        store
    }

    // --- Profiles ---

    pub fn profiles(&self) -> &[UserProfile] {
        &self.profiles
    }

    pub fn profile(&self, id: &str) -> Option<&UserProfile> {
        self.profiles.iter().find(|p| p.id == id)
    }

    pub fn current_profile(&self) -> Option<&UserProfile> {
        self.profile(self.current_id.as_deref()?)
    }

    pub fn current_profile_id(&self) -> Option<&str> {
        self.current_id.as_deref()
    }

    /// Create an empty profile with default preferences. It becomes current
    /// only if there was no current profile.
    pub fn create_profile(&mut self, name: &str) -> UserProfile {
        let profile = new_profile(name);

        self.profiles.push(profile.clone());
        if self.current_id.is_none() {
            self.current_id = Some(profile.id.clone());
        }
        self.save();

        info!("Created profile '{}' ({})", profile.name, profile.id);
        profile
    }

    pub fn update_profile(&mut self, id: &str, update: ProfileUpdate) {
        let Some(profile) = self.profiles.iter_mut().find(|p| p.id == id) else {
            return;
        };

        if let Some(name) = update.name {
            profile.name = name;
        }
        if let Some(preferences) = update.preferences {
            profile.preferences = preferences;
        }
        profile.updated_at = now();
        self.save();
    }

    /// Remove a profile. If it was current, the first remaining profile (or
    /// none) becomes current.
    pub fn delete_profile(&mut self, id: &str) {
        let before = self.profiles.len();
        self.profiles.retain(|p| p.id != id);
        if self.profiles.len() == before {
            return;
        }

        if self.current_id.as_deref() == Some(id) {
            self.current_id = self.profiles.first().map(|p| p.id.clone());
        }
        self.save();
        info!("Deleted profile {}", id);
    }

    pub fn set_active_profile(&mut self, id: &str) {
        if self.profile(id).is_some() {
            self.current_id = Some(id.to_string());
            self.save();
        }
    }

    // --- Printers ---

    /// Add a printer to the current profile. Returns `None` if there is no
    /// current profile.
    pub fn add_printer(&mut self, printer: NewPrinter) -> Option<PrinterProfile> {
        let Some(profile) = self.current_mut() else {
            warn!("Ignoring add_printer: no current profile");
            return None;
        };

        let now = now();
        let printer = printer.into_profile(generate_id(), now);
        profile.printers.push(printer.clone());
        profile.updated_at = now;
        self.save();

        debug!("Added printer '{}' ({})", printer.name, printer.id);
        Some(printer)
    }

    pub fn update_printer(&mut self, id: &str, update: PrinterUpdate) {
        let Some(profile) = self.current_mut() else {
            return;
        };
        let Some(printer) = profile.printers.iter_mut().find(|p| p.id == id) else {
            return;
        };

        let now = now();
        update.apply_to(printer);
        printer.updated_at = now;
        profile.updated_at = now;
        self.save();
    }

    /// Remove a printer, clearing the active selection if it pointed there.
    pub fn delete_printer(&mut self, id: &str) {
        let Some(profile) = self.current_mut() else {
            return;
        };
        if profile.printer(id).is_none() {
            return;
        }

        profile.printers.retain(|p| p.id != id);
        if profile.active_printer_id.as_deref() == Some(id) {
            profile.active_printer_id = None;
        }
        profile.updated_at = now();
        self.save();
    }

    pub fn set_active_printer(&mut self, id: &str) {
        let Some(profile) = self.current_mut() else {
            return;
        };
        if profile.printer(id).is_none() {
            return;
        }

        profile.active_printer_id = Some(id.to_string());
        profile.updated_at = now();
        self.save();
    }

    pub fn active_printer(&self) -> Option<&PrinterProfile> {
        self.current_profile()?.active_printer()
    }

    // --- Filaments ---

    /// Add a filament to the current profile. Returns `None` if there is no
    /// current profile.
    pub fn add_filament(&mut self, filament: NewFilament) -> Option<FilamentProfile> {
        let Some(profile) = self.current_mut() else {
            warn!("Ignoring add_filament: no current profile");
            return None;
        };

        let now = now();
        let filament = filament.into_profile(generate_id(), now);
        profile.filaments.push(filament.clone());
        profile.updated_at = now;
        self.save();

        debug!("Added filament '{}' ({})", filament.name, filament.id);
        Some(filament)
    }

    pub fn update_filament(&mut self, id: &str, update: FilamentUpdate) {
        let Some(profile) = self.current_mut() else {
            return;
        };
        let Some(filament) = profile.filaments.iter_mut().find(|f| f.id == id) else {
            return;
        };

        let now = now();
        update.apply_to(filament);
        filament.updated_at = now;
        profile.updated_at = now;
        self.save();
    }

    /// Remove a filament, clearing the active selection if it pointed there.
    pub fn delete_filament(&mut self, id: &str) {
        let Some(profile) = self.current_mut() else {
            return;
        };
        if profile.filament(id).is_none() {
            return;
        }

        profile.filaments.retain(|f| f.id != id);
        if profile.active_filament_id.as_deref() == Some(id) {
            profile.active_filament_id = None;
        }
        profile.updated_at = now();
        self.save();
    }

    pub fn set_active_filament(&mut self, id: &str) {
        let Some(profile) = self.current_mut() else {
            return;
        };
        if profile.filament(id).is_none() {
            return;
        }

        profile.active_filament_id = Some(id.to_string());
        profile.updated_at = now();
        self.save();
    }

    pub fn active_filament(&self) -> Option<&FilamentProfile> {
        self.current_profile()?.active_filament()
    }

    // --- Import/Export ---

    /// Snapshot of the current profile, or `None` without one.
    pub fn export_profile(&self) -> Option<ProfileExport> {
        Some(ProfileExport {
            profile: self.current_profile()?.clone(),
            exported_at: now(),
            version: EXPORT_VERSION.to_string(),
        })
    }

    /// Append a profile from a single-profile export.
    ///
    /// The profile gets a new id and fresh timestamps so it never collides
    /// with an existing one. The current profile is unchanged.
    pub fn import_profile(&mut self, data: &Value) -> bool {
        let mut profile: UserProfile =
            match parse_section(data, "profile", VersionPolicy::Required) {
                Ok(profile) => profile,
                Err(e) => {
                    warn!("Failed to import profile: {}", e);
                    return false;
                }
            };

        let now = now();
        profile.id = generate_id();
        profile.created_at = now;
        profile.updated_at = now;
        profile.repair_active_pointers();

        info!("Imported profile '{}' as {}", profile.name, profile.id);
        self.profiles.push(profile);
        self.save();
        true
    }

    pub fn export_all_profiles(&self) -> ProfilesExport {
        ProfilesExport {
            profiles: self.profiles.clone(),
            exported_at: now(),
            version: EXPORT_VERSION.to_string(),
        }
    }

    /// Replace every profile with those of an all-profiles export.
    ///
    /// If the current profile is not part of the new list, the first
    /// imported profile (or none) becomes current.
    pub fn import_all_profiles(&mut self, data: &Value) -> bool {
        let mut profiles: Vec<UserProfile> =
            match parse_section(data, "profiles", VersionPolicy::Required) {
                Ok(profiles) => profiles,
                Err(e) => {
                    warn!("Failed to import profiles: {}", e);
                    return false;
                }
            };

        for profile in &mut profiles {
            profile.repair_active_pointers();
        }

        let keeps_current = self
            .current_id
            .as_deref()
            .is_some_and(|id| profiles.iter().any(|p| p.id == id));
        if !keeps_current {
            self.current_id = profiles.first().map(|p| p.id.clone());
        }

        info!("Imported {} profiles", profiles.len());
        self.profiles = profiles;
        self.save();
        true
    }

    fn current_mut(&mut self) -> Option<&mut UserProfile> {
        let id = self.current_id.as_deref()?;
        self.profiles.iter_mut().find(|p| p.id == id)
    }

    fn save(&self) {
        self.persistence
            .save_json(USER_PROFILES_KEY, &self.profiles);
        match &self.current_id {
            Some(id) => {
                self.persistence.save(ACTIVE_PROFILE_KEY, id);
            }
            None => {
                self.persistence.remove(ACTIVE_PROFILE_KEY);
            }
        }
    }
}

fn new_profile(name: &str) -> UserProfile {
    let now = now();
    UserProfile {
        id: generate_id(),
        name: name.to_string(),
        active_printer_id: None,
        active_filament_id: None,
        printers: Vec::new(),
        filaments: Vec::new(),
        preferences: Preferences::default(),
        created_at: now,
        updated_at: now,
    }
}

/// Decode the stored profile list entry by entry. The flag is false when
/// the list itself or any entry in it could not be read.
fn decode_profiles(raw: &str) -> (Vec<UserProfile>, bool) {
    let entries: Vec<Value> = match serde_json::from_str(raw) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Stored profile list is malformed: {}", e);
            return (Vec::new(), false);
        }
    };

    let mut intact = true;
    let mut profiles = Vec::with_capacity(entries.len());
    for entry in entries {
        match serde_json::from_value::<UserProfile>(entry) {
            Ok(profile) => profiles.push(profile),
            Err(e) => {
                warn!("Skipping unreadable stored profile: {}", e);
                intact = false;
            }
        }
    }
    (profiles, intact)
}
