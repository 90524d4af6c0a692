use directories::UserDirs;
use log::info;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::classifier::{self, MissingJointPolicy, PoseClassifier};
use crate::error::{Error, Result};
use crate::pinch::{self, PinchConfig};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Meta {
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub angle_tolerance_deg: f32,
    pub distance_tolerance_m: f32,
    pub pinch_distance_m: f32,
    pub pinch_validity_s: f64,
    pub smoothing_alpha: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            angle_tolerance_deg: classifier::ANGLE_TOLERANCE_DEG,
            distance_tolerance_m: classifier::DISTANCE_TOLERANCE,
            pinch_distance_m: pinch::PINCH_DISTANCE_THRESHOLD,
            pinch_validity_s: pinch::PINCH_VALIDITY_DURATION,
            smoothing_alpha: pinch::SMOOTHING_FACTOR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    pub missing_joints: MissingJointPolicy,
    pub tick_hz: f64,
    pub reset_pinch_on_absence: bool,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            missing_joints: MissingJointPolicy::default(),
            tick_hz: 90.0,
            reset_pinch_on_absence: false,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub meta: Meta,
    pub thresholds: Thresholds,
    pub engine: EngineSection,
}

/// Everything the per-frame engine needs, resolved from a profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineSettings {
    pub classifier: PoseClassifier,
    pub pinch: PinchConfig,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            classifier: PoseClassifier::default(),
            pinch: PinchConfig::default(),
        }
    }
}

impl Profile {
    pub fn parse(text: &str, origin: &Path) -> Result<Self> {
        let profile: Profile = toml::from_str(text).map_err(|source| Error::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        validate_profile(&profile)?;
        Ok(profile)
    }

    pub fn engine_settings(&self) -> EngineSettings {
        let th = &self.thresholds;
        EngineSettings {
            classifier: PoseClassifier {
                angle_tolerance: th.angle_tolerance_deg.to_radians(),
                distance_tolerance: th.distance_tolerance_m,
                missing_joints: self.engine.missing_joints,
            },
            pinch: PinchConfig {
                distance_threshold: th.pinch_distance_m,
                validity_duration: th.pinch_validity_s,
                smoothing: th.smoothing_alpha,
                reset_on_absence: self.engine.reset_pinch_on_absence,
            },
        }
    }
}

const TICK_HZ_RANGE: std::ops::RangeInclusive<f64> = 1.0..=1000.0;

fn validate_profile(p: &Profile) -> Result<()> {
    let th = &p.thresholds;
    let invalid = |msg: &str| Err(Error::InvalidProfile(msg.to_string()));

    if !(th.angle_tolerance_deg > 0.0 && th.angle_tolerance_deg < 90.0) {
        return invalid("thresholds.angle_tolerance_deg must be in (0,90)");
    }
    if !(th.distance_tolerance_m > 0.0) || !(th.pinch_distance_m > 0.0) {
        return invalid("distance thresholds must be positive meters");
    }
    if !(th.pinch_validity_s >= 0.0 && th.pinch_validity_s.is_finite()) {
        return invalid("thresholds.pinch_validity_s must be a non-negative duration");
    }
    if !(th.smoothing_alpha > 0.0 && th.smoothing_alpha <= 1.0) {
        return invalid("thresholds.smoothing_alpha must be in (0,1]");
    }
    if !TICK_HZ_RANGE.contains(&p.engine.tick_hz) {
        return invalid("engine.tick_hz must be within 1..=1000");
    }
    Ok(())
}

// ── Profile store ──────────────────────────────────────────

/// Profiles on disk plus the active selection.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    pub active_name: String,
    pub profile: Profile,
    pub config_dir: PathBuf,
    pub profiles_dir: PathBuf,
    pub active_ptr: PathBuf,
}

pub fn default_config_dir() -> Result<PathBuf> {
    let home = UserDirs::new().ok_or(Error::NoHome)?.home_dir().to_path_buf();
    Ok(home.join(".config").join("handpose"))
}

fn default_profile_text() -> &'static str {
    include_str!("../profiles/default.toml")
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> Error + '_ {
    move |source| Error::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Read the active profile without touching the config directory.
///
/// `Ok(None)` when nothing has been installed yet.
pub fn read_active(config_dir: &Path) -> Result<Option<(String, Profile)>> {
    let active_ptr = config_dir.join("active");
    let name = match fs::read_to_string(&active_ptr) {
        Ok(text) => text.trim().to_string(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => "default".to_string(),
        Err(e) => return Err(io_err(&active_ptr)(e)),
    };
    match load_profile(&config_dir.join("profiles"), &name) {
        Ok(profile) => Ok(Some((name, profile))),
        Err(Error::ProfileNotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

impl ProfileStore {
    pub fn load_or_install_default() -> Result<Self> {
        Self::open(default_config_dir()?)
    }

    /// Open a config directory, installing the default profile and active
    /// pointer on first use.
    pub fn open(config_dir: PathBuf) -> Result<Self> {
        let profiles_dir = config_dir.join("profiles");
        fs::create_dir_all(&profiles_dir).map_err(io_err(&profiles_dir))?;

        let def_path = profiles_dir.join("default.toml");
        if !def_path.exists() {
            fs::write(&def_path, default_profile_text()).map_err(io_err(&def_path))?;
            info!("installed default profile at {}", def_path.display());
        }

        let active_ptr = config_dir.join("active");
        if !active_ptr.exists() {
            fs::write(&active_ptr, b"default").map_err(io_err(&active_ptr))?;
        }

        let active_name = fs::read_to_string(&active_ptr)
            .map_err(io_err(&active_ptr))?
            .trim()
            .to_string();
        let profile = load_profile(&profiles_dir, &active_name)?;

        Ok(Self {
            active_name,
            profile,
            config_dir,
            profiles_dir,
            active_ptr,
        })
    }

    /// Re-read the active profile. On error the last good profile is kept.
    pub fn reload(&mut self) -> Result<()> {
        self.profile = load_profile(&self.profiles_dir, &self.active_name)?;
        Ok(())
    }

    pub fn set_active(&mut self, name: &str) -> Result<()> {
        check_profile_name(name)?;
        let profile = load_profile(&self.profiles_dir, name)?;
        fs::write(&self.active_ptr, name.as_bytes()).map_err(io_err(&self.active_ptr))?;
        self.active_name = name.to_string();
        self.profile = profile;
        Ok(())
    }

    pub fn list_profiles(&self) -> Vec<String> {
        let mut v = Vec::new();
        if let Ok(rd) = fs::read_dir(&self.profiles_dir) {
            for e in rd.flatten() {
                let path = e.path();
                if path.extension().is_some_and(|ext| ext == "toml") {
                    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                        v.push(stem.to_string());
                    }
                }
            }
        }
        v.sort();
        v
    }
}

/// Profile names are bare file stems inside the profiles directory.
fn check_profile_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(Error::InvalidProfileName(name.to_string()));
    }
    Ok(())
}

fn load_profile(dir: &Path, name: &str) -> Result<Profile> {
    check_profile_name(name)?;
    let path = dir.join(format!("{name}.toml"));
    if !path.exists() {
        return Err(Error::ProfileNotFound(path));
    }
    let txt = fs::read_to_string(&path).map_err(io_err(&path))?;
    Profile::parse(&txt, &path)
}
