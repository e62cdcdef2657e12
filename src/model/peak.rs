//! Peak-profile parameter sets
//!
//! Each profile is a variant of [`Peak`] owning exactly the parameters that
//! profile needs. Variants are assembled from shared groups (broadening,
//! asymmetry) attached to the variant's own category core. The factory
//! [`Peak::create`] picks the variant from the scattering type, beam mode and
//! an optional profile name.

use crate::categories::{CategoryCore, CategoryItem};
use crate::model::{string_enum, BeamMode, ModelError, ParamSpec, ScatteringType};
use crate::parameters::{Bounds, ParameterRef};

string_enum! {
    PeakProfileType, "peak profile" {
        PseudoVoigt => "pseudo-voigt",
        SplitPseudoVoigt => "split pseudo-voigt",
        ThompsonCoxHastings => "thompson-cox-hastings",
        PseudoVoigtIkedaCarpenter => "pseudo-voigt * ikeda-carpenter",
        PseudoVoigtBackToBack => "pseudo-voigt * back-to-back",
        GaussianDampedSinc => "gaussian-damped-sinc",
    }
}

impl PeakProfileType {
    /// Profiles available for a scattering type and beam mode; the first is
    /// the default
    pub fn supported(scattering_type: ScatteringType, beam_mode: BeamMode) -> &'static [PeakProfileType] {
        use PeakProfileType::*;
        match (scattering_type, beam_mode) {
            (ScatteringType::Bragg, BeamMode::ConstantWavelength) => {
                &[PseudoVoigt, SplitPseudoVoigt, ThompsonCoxHastings]
            }
            (ScatteringType::Bragg, BeamMode::TimeOfFlight) => {
                &[PseudoVoigtIkedaCarpenter, PseudoVoigt, PseudoVoigtBackToBack]
            }
            (ScatteringType::Total, _) => &[GaussianDampedSinc],
        }
    }

    pub fn default_for(scattering_type: ScatteringType, beam_mode: BeamMode) -> PeakProfileType {
        Self::supported(scattering_type, beam_mode)[0]
    }
}

/// Caglioti U, V, W and Lorentzian X, Y
#[derive(Debug)]
pub struct CwlBroadening {
    pub broad_gauss_u: ParameterRef,
    pub broad_gauss_v: ParameterRef,
    pub broad_gauss_w: ParameterRef,
    pub broad_lorentz_x: ParameterRef,
    pub broad_lorentz_y: ParameterRef,
}

impl CwlBroadening {
    fn attach(core: &mut CategoryCore) -> Result<Self, ModelError> {
        Ok(Self {
            broad_gauss_u: ParamSpec::new("broad_gauss_u", "_peak.broad_gauss_u", 0.01)
                .units("deg²")
                .description("Gaussian broadening, U term")
                .attach(core)?,
            broad_gauss_v: ParamSpec::new("broad_gauss_v", "_peak.broad_gauss_v", -0.01)
                .units("deg²")
                .description("Gaussian broadening, V term")
                .attach(core)?,
            broad_gauss_w: ParamSpec::new("broad_gauss_w", "_peak.broad_gauss_w", 0.02)
                .units("deg²")
                .description("Gaussian broadening, W term")
                .attach(core)?,
            broad_lorentz_x: ParamSpec::new("broad_lorentz_x", "_peak.broad_lorentz_x", 0.0)
                .units("deg")
                .description("Lorentzian broadening, X term")
                .attach(core)?,
            broad_lorentz_y: ParamSpec::new("broad_lorentz_y", "_peak.broad_lorentz_y", 0.0)
                .units("deg")
                .description("Lorentzian broadening, Y term")
                .attach(core)?,
        })
    }
}

#[derive(Debug)]
pub struct EmpiricalAsymmetry {
    pub asym_empir_1: ParameterRef,
    pub asym_empir_2: ParameterRef,
    pub asym_empir_3: ParameterRef,
    pub asym_empir_4: ParameterRef,
}

impl EmpiricalAsymmetry {
    fn attach(core: &mut CategoryCore) -> Result<Self, ModelError> {
        Ok(Self {
            asym_empir_1: ParamSpec::new("asym_empir_1", "_peak.asym_empir_1", 0.1).attach(core)?,
            asym_empir_2: ParamSpec::new("asym_empir_2", "_peak.asym_empir_2", 0.2).attach(core)?,
            asym_empir_3: ParamSpec::new("asym_empir_3", "_peak.asym_empir_3", 0.3).attach(core)?,
            asym_empir_4: ParamSpec::new("asym_empir_4", "_peak.asym_empir_4", 0.4).attach(core)?,
        })
    }
}

/// Finger-Cox-Jephcoat axial divergence
#[derive(Debug)]
pub struct FcjAsymmetry {
    pub asym_fcj_1: ParameterRef,
    pub asym_fcj_2: ParameterRef,
}

impl FcjAsymmetry {
    fn attach(core: &mut CategoryCore) -> Result<Self, ModelError> {
        Ok(Self {
            asym_fcj_1: ParamSpec::new("asym_fcj_1", "_peak.asym_fcj_1", 0.01).attach(core)?,
            asym_fcj_2: ParamSpec::new("asym_fcj_2", "_peak.asym_fcj_2", 0.02).attach(core)?,
        })
    }
}

#[derive(Debug)]
pub struct TofBroadening {
    pub broad_gauss_sigma_0: ParameterRef,
    pub broad_gauss_sigma_1: ParameterRef,
    pub broad_gauss_sigma_2: ParameterRef,
    pub broad_lorentz_gamma_0: ParameterRef,
    pub broad_lorentz_gamma_1: ParameterRef,
    pub broad_lorentz_gamma_2: ParameterRef,
    pub broad_mix_beta_0: ParameterRef,
    pub broad_mix_beta_1: ParameterRef,
}

impl TofBroadening {
    fn attach(core: &mut CategoryCore) -> Result<Self, ModelError> {
        let mut param = |name: &str, cif: &str, units: &str| {
            ParamSpec::new(name, cif, 0.0).units(units).attach(core)
        };
        Ok(Self {
            broad_gauss_sigma_0: param("broad_gauss_sigma_0", "_peak.broad_gauss_sigma_0", "µs²")?,
            broad_gauss_sigma_1: param("broad_gauss_sigma_1", "_peak.broad_gauss_sigma_1", "µs/Å")?,
            broad_gauss_sigma_2: param("broad_gauss_sigma_2", "_peak.broad_gauss_sigma_2", "µs²/Ų")?,
            broad_lorentz_gamma_0: param("broad_lorentz_gamma_0", "_peak.broad_lorentz_gamma_0", "µs")?,
            broad_lorentz_gamma_1: param("broad_lorentz_gamma_1", "_peak.broad_lorentz_gamma_1", "µs/Å")?,
            broad_lorentz_gamma_2: param("broad_lorentz_gamma_2", "_peak.broad_lorentz_gamma_2", "µs²/Ų")?,
            broad_mix_beta_0: param("broad_mix_beta_0", "_peak.broad_mix_beta_0", "deg")?,
            broad_mix_beta_1: param("broad_mix_beta_1", "_peak.broad_mix_beta_1", "deg")?,
        })
    }
}

/// Moderator pulse asymmetry for TOF profiles
#[derive(Debug)]
pub struct IkedaCarpenterAsymmetry {
    pub asym_alpha_0: ParameterRef,
    pub asym_alpha_1: ParameterRef,
}

impl IkedaCarpenterAsymmetry {
    fn attach(core: &mut CategoryCore) -> Result<Self, ModelError> {
        Ok(Self {
            asym_alpha_0: ParamSpec::new("asym_alpha_0", "_peak.asym_alpha_0", 0.01).attach(core)?,
            asym_alpha_1: ParamSpec::new("asym_alpha_1", "_peak.asym_alpha_1", 0.02).attach(core)?,
        })
    }
}

/// Damping and sharpening terms of a pair distribution function
#[derive(Debug)]
pub struct PairDistributionShape {
    pub damp_q: ParameterRef,
    pub broad_q: ParameterRef,
    pub cutoff_q: ParameterRef,
    pub sharp_delta_1: ParameterRef,
    pub sharp_delta_2: ParameterRef,
    pub damp_particle_diameter: ParameterRef,
}

impl PairDistributionShape {
    fn attach(core: &mut CategoryCore) -> Result<Self, ModelError> {
        let non_negative = Bounds::min_only(0.0);
        Ok(Self {
            damp_q: ParamSpec::new("damp_q", "_peak.damp_q", 0.05)
                .units("Å⁻¹")
                .description("Q-resolution damping")
                .bounds(non_negative)
                .attach(core)?,
            broad_q: ParamSpec::new("broad_q", "_peak.broad_q", 0.0)
                .units("Å⁻²")
                .description("Q-dependent peak broadening")
                .bounds(non_negative)
                .attach(core)?,
            cutoff_q: ParamSpec::new("cutoff_q", "_peak.cutoff_q", 25.0)
                .units("Å⁻¹")
                .description("Fourier transform cutoff")
                .bounds(non_negative)
                .attach(core)?,
            sharp_delta_1: ParamSpec::new("sharp_delta_1", "_peak.sharp_delta_1", 0.0)
                .units("Å")
                .description("Low-r peak sharpening, 1/r term")
                .attach(core)?,
            sharp_delta_2: ParamSpec::new("sharp_delta_2", "_peak.sharp_delta_2", 0.0)
                .units("Ų")
                .description("Low-r peak sharpening, 1/r² term")
                .attach(core)?,
            damp_particle_diameter: ParamSpec::new(
                "damp_particle_diameter",
                "_peak.damp_particle_diameter",
                0.0,
            )
            .units("Å")
            .description("Spherical particle envelope diameter")
            .bounds(non_negative)
            .attach(core)?,
        })
    }
}

#[derive(Debug)]
pub struct CwlPseudoVoigt {
    core: CategoryCore,
    pub broadening: CwlBroadening,
}

#[derive(Debug)]
pub struct CwlSplitPseudoVoigt {
    core: CategoryCore,
    pub broadening: CwlBroadening,
    pub asymmetry: EmpiricalAsymmetry,
}

#[derive(Debug)]
pub struct CwlThompsonCoxHastings {
    core: CategoryCore,
    pub broadening: CwlBroadening,
    pub asymmetry: FcjAsymmetry,
}

#[derive(Debug)]
pub struct TofPseudoVoigt {
    core: CategoryCore,
    pub broadening: TofBroadening,
}

#[derive(Debug)]
pub struct TofPseudoVoigtIkedaCarpenter {
    core: CategoryCore,
    pub broadening: TofBroadening,
    pub asymmetry: IkedaCarpenterAsymmetry,
}

#[derive(Debug)]
pub struct TofPseudoVoigtBackToBack {
    core: CategoryCore,
    pub broadening: TofBroadening,
    pub asymmetry: IkedaCarpenterAsymmetry,
}

#[derive(Debug)]
pub struct TotalGaussianDampedSinc {
    core: CategoryCore,
    pub shape: PairDistributionShape,
}

/// The `peak` category of an experiment
#[derive(Debug)]
pub enum Peak {
    CwlPseudoVoigt(CwlPseudoVoigt),
    CwlSplitPseudoVoigt(CwlSplitPseudoVoigt),
    CwlThompsonCoxHastings(CwlThompsonCoxHastings),
    TofPseudoVoigt(TofPseudoVoigt),
    TofPseudoVoigtIkedaCarpenter(TofPseudoVoigtIkedaCarpenter),
    TofPseudoVoigtBackToBack(TofPseudoVoigtBackToBack),
    TotalGaussianDampedSinc(TotalGaussianDampedSinc),
}

impl Peak {
    /// Build the parameter set for a profile
    ///
    /// # Arguments
    ///
    /// * `scattering_type` - Bragg or total scattering
    /// * `beam_mode` - Constant wavelength or time-of-flight
    /// * `profile` - Profile to use, or `None` for the default of the pair
    ///
    /// # Returns
    ///
    /// The peak category, or [`ModelError::UnsupportedPeakProfile`] if the
    /// profile does not exist for that scattering type and beam mode
    pub fn create(
        scattering_type: ScatteringType,
        beam_mode: BeamMode,
        profile: Option<PeakProfileType>,
    ) -> Result<Peak, ModelError> {
        let profile = profile.unwrap_or_else(|| PeakProfileType::default_for(scattering_type, beam_mode));
        if !PeakProfileType::supported(scattering_type, beam_mode).contains(&profile) {
            return Err(ModelError::UnsupportedPeakProfile {
                profile: profile.to_string(),
                scattering_type: scattering_type.to_string(),
                beam_mode: beam_mode.to_string(),
            });
        }

        let mut core = CategoryCore::new("peak");
        let peak = match (beam_mode, profile) {
            (_, PeakProfileType::GaussianDampedSinc) => {
                let shape = PairDistributionShape::attach(&mut core)?;
                Peak::TotalGaussianDampedSinc(TotalGaussianDampedSinc { core, shape })
            }
            (BeamMode::ConstantWavelength, PeakProfileType::SplitPseudoVoigt) => {
                let broadening = CwlBroadening::attach(&mut core)?;
                let asymmetry = EmpiricalAsymmetry::attach(&mut core)?;
                Peak::CwlSplitPseudoVoigt(CwlSplitPseudoVoigt {
                    core,
                    broadening,
                    asymmetry,
                })
            }
            (BeamMode::ConstantWavelength, PeakProfileType::ThompsonCoxHastings) => {
                let broadening = CwlBroadening::attach(&mut core)?;
                let asymmetry = FcjAsymmetry::attach(&mut core)?;
                Peak::CwlThompsonCoxHastings(CwlThompsonCoxHastings {
                    core,
                    broadening,
                    asymmetry,
                })
            }
            (BeamMode::ConstantWavelength, _) => {
                let broadening = CwlBroadening::attach(&mut core)?;
                Peak::CwlPseudoVoigt(CwlPseudoVoigt { core, broadening })
            }
            (BeamMode::TimeOfFlight, PeakProfileType::PseudoVoigtIkedaCarpenter) => {
                let broadening = TofBroadening::attach(&mut core)?;
                let asymmetry = IkedaCarpenterAsymmetry::attach(&mut core)?;
                Peak::TofPseudoVoigtIkedaCarpenter(TofPseudoVoigtIkedaCarpenter {
                    core,
                    broadening,
                    asymmetry,
                })
            }
            (BeamMode::TimeOfFlight, PeakProfileType::PseudoVoigtBackToBack) => {
                let broadening = TofBroadening::attach(&mut core)?;
                let asymmetry = IkedaCarpenterAsymmetry::attach(&mut core)?;
                Peak::TofPseudoVoigtBackToBack(TofPseudoVoigtBackToBack {
                    core,
                    broadening,
                    asymmetry,
                })
            }
            (BeamMode::TimeOfFlight, _) => {
                let broadening = TofBroadening::attach(&mut core)?;
                Peak::TofPseudoVoigt(TofPseudoVoigt { core, broadening })
            }
        };
        Ok(peak)
    }

    pub fn profile_type(&self) -> PeakProfileType {
        match self {
            Peak::CwlPseudoVoigt(_) | Peak::TofPseudoVoigt(_) => PeakProfileType::PseudoVoigt,
            Peak::CwlSplitPseudoVoigt(_) => PeakProfileType::SplitPseudoVoigt,
            Peak::CwlThompsonCoxHastings(_) => PeakProfileType::ThompsonCoxHastings,
            Peak::TofPseudoVoigtIkedaCarpenter(_) => PeakProfileType::PseudoVoigtIkedaCarpenter,
            Peak::TofPseudoVoigtBackToBack(_) => PeakProfileType::PseudoVoigtBackToBack,
            Peak::TotalGaussianDampedSinc(_) => PeakProfileType::GaussianDampedSinc,
        }
    }
}

impl CategoryItem for Peak {
    fn core(&self) -> &CategoryCore {
        match self {
            Peak::CwlPseudoVoigt(p) => &p.core,
            Peak::CwlSplitPseudoVoigt(p) => &p.core,
            Peak::CwlThompsonCoxHastings(p) => &p.core,
            Peak::TofPseudoVoigt(p) => &p.core,
            Peak::TofPseudoVoigtIkedaCarpenter(p) => &p.core,
            Peak::TofPseudoVoigtBackToBack(p) => &p.core,
            Peak::TotalGaussianDampedSinc(p) => &p.core,
        }
    }
}
