//! Instrument parameter sets, one per beam mode

use crate::categories::{CategoryCore, CategoryItem};
use crate::model::{BeamMode, ModelError, ParamSpec};
use crate::parameters::{Bounds, ParameterRef};

/// Constant-wavelength diffractometer
#[derive(Debug)]
pub struct CwlInstrument {
    core: CategoryCore,
    pub setup_wavelength: ParameterRef,
    pub calib_twotheta_offset: ParameterRef,
}

impl CwlInstrument {
    pub fn new() -> Result<Self, ModelError> {
        let mut core = CategoryCore::new("instrument");
        let setup_wavelength = ParamSpec::new("setup_wavelength", "_instr.wavelength", 1.5406)
            .units("Å")
            .description("Incident neutron or X-ray wavelength")
            .bounds(Bounds::min_only(0.0))
            .attach(&mut core)?;
        let calib_twotheta_offset =
            ParamSpec::new("calib_twotheta_offset", "_instr.2theta_offset", 0.0)
                .units("deg")
                .description("Instrument misalignment offset")
                .attach(&mut core)?;

        Ok(Self {
            core,
            setup_wavelength,
            calib_twotheta_offset,
        })
    }
}

/// Time-of-flight diffractometer bank
#[derive(Debug)]
pub struct TofInstrument {
    core: CategoryCore,
    pub setup_twotheta_bank: ParameterRef,
    pub calib_d_to_tof_offset: ParameterRef,
    pub calib_d_to_tof_linear: ParameterRef,
    pub calib_d_to_tof_quad: ParameterRef,
}

impl TofInstrument {
    pub fn new() -> Result<Self, ModelError> {
        let mut core = CategoryCore::new("instrument");
        let setup_twotheta_bank = ParamSpec::new("setup_twotheta_bank", "_instr.2theta_bank", 150.0)
            .units("deg")
            .description("Detector bank position")
            .bounds(Bounds::new(0.0, 180.0)?)
            .attach(&mut core)?;
        let calib_d_to_tof_offset =
            ParamSpec::new("calib_d_to_tof_offset", "_instr.d_to_tof_offset", 0.0)
                .units("µs")
                .description("TOF offset")
                .attach(&mut core)?;
        let calib_d_to_tof_linear =
            ParamSpec::new("calib_d_to_tof_linear", "_instr.d_to_tof_linear", 10000.0)
                .units("µs/Å")
                .description("TOF linear conversion")
                .attach(&mut core)?;
        let calib_d_to_tof_quad =
            ParamSpec::new("calib_d_to_tof_quad", "_instr.d_to_tof_quad", -0.00001)
                .units("µs/Å²")
                .description("TOF quadratic correction")
                .attach(&mut core)?;

        Ok(Self {
            core,
            setup_twotheta_bank,
            calib_d_to_tof_offset,
            calib_d_to_tof_linear,
            calib_d_to_tof_quad,
        })
    }
}

#[derive(Debug)]
pub enum Instrument {
    ConstantWavelength(CwlInstrument),
    TimeOfFlight(TofInstrument),
}

impl Instrument {
    /// Instrument with default parameters for the given beam mode
    pub fn for_beam_mode(beam_mode: BeamMode) -> Result<Self, ModelError> {
        Ok(match beam_mode {
            BeamMode::ConstantWavelength => Instrument::ConstantWavelength(CwlInstrument::new()?),
            BeamMode::TimeOfFlight => Instrument::TimeOfFlight(TofInstrument::new()?),
        })
    }

    pub fn beam_mode(&self) -> BeamMode {
        match self {
            Instrument::ConstantWavelength(_) => BeamMode::ConstantWavelength,
            Instrument::TimeOfFlight(_) => BeamMode::TimeOfFlight,
        }
    }
}

impl CategoryItem for Instrument {
    fn core(&self) -> &CategoryCore {
        match self {
            Instrument::ConstantWavelength(i) => &i.core,
            Instrument::TimeOfFlight(i) => &i.core,
        }
    }
}
