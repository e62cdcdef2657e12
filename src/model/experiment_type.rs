use crate::categories::{CategoryCore, CategoryItem};
use crate::model::{string_enum, text_descriptor, ModelError};
use crate::parameters::DescriptorRef;

string_enum! {
    /// Physical form of the measured sample
    SampleForm, "sample form" {
        Powder => "powder",
        SingleCrystal => "single crystal",
    }
}

string_enum! {
    /// How the diffraction pattern is scanned
    BeamMode, "beam mode" {
        ConstantWavelength => "constant wavelength",
        TimeOfFlight => "time-of-flight",
    }
}

string_enum! {
    RadiationProbe, "radiation probe" {
        Neutron => "neutron",
        Xray => "xray",
    }
}

string_enum! {
    /// Bragg peaks only, or total scattering (pair distribution function)
    ScatteringType, "scattering type" {
        Bragg => "bragg",
        Total => "total",
    }
}

/// The `expt_type` category
///
/// Fixed when the experiment is created: every descriptor is non-editable,
/// since instrument and peak parameter sets are chosen from these values.
#[derive(Debug)]
pub struct ExperimentType {
    core: CategoryCore,
    sample_form: SampleForm,
    beam_mode: BeamMode,
    radiation_probe: RadiationProbe,
    scattering_type: ScatteringType,
    pub sample_form_descriptor: DescriptorRef,
    pub beam_mode_descriptor: DescriptorRef,
    pub radiation_probe_descriptor: DescriptorRef,
    pub scattering_type_descriptor: DescriptorRef,
}

impl ExperimentType {
    pub fn new(
        sample_form: SampleForm,
        beam_mode: BeamMode,
        radiation_probe: RadiationProbe,
        scattering_type: ScatteringType,
    ) -> Result<Self, ModelError> {
        let mut core = CategoryCore::new("expt_type");
        let sample_form_descriptor = text_descriptor(
            &mut core,
            "sample_form",
            "_expt_type.sample_form",
            sample_form.as_str(),
            Some(SampleForm::texts().as_slice()),
            false,
        )?;
        let beam_mode_descriptor = text_descriptor(
            &mut core,
            "beam_mode",
            "_expt_type.beam_mode",
            beam_mode.as_str(),
            Some(BeamMode::texts().as_slice()),
            false,
        )?;
        let radiation_probe_descriptor = text_descriptor(
            &mut core,
            "radiation_probe",
            "_expt_type.radiation_probe",
            radiation_probe.as_str(),
            Some(RadiationProbe::texts().as_slice()),
            false,
        )?;
        let scattering_type_descriptor = text_descriptor(
            &mut core,
            "scattering_type",
            "_expt_type.scattering_type",
            scattering_type.as_str(),
            Some(ScatteringType::texts().as_slice()),
            false,
        )?;

        Ok(Self {
            core,
            sample_form,
            beam_mode,
            radiation_probe,
            scattering_type,
            sample_form_descriptor,
            beam_mode_descriptor,
            radiation_probe_descriptor,
            scattering_type_descriptor,
        })
    }

    /// Powder, constant wavelength, neutron, Bragg
    pub fn powder_cwl_neutron() -> Result<Self, ModelError> {
        Self::new(
            SampleForm::Powder,
            BeamMode::ConstantWavelength,
            RadiationProbe::Neutron,
            ScatteringType::Bragg,
        )
    }

    pub fn sample_form(&self) -> SampleForm {
        self.sample_form
    }

    pub fn beam_mode(&self) -> BeamMode {
        self.beam_mode
    }

    pub fn radiation_probe(&self) -> RadiationProbe {
        self.radiation_probe
    }

    pub fn scattering_type(&self) -> ScatteringType {
        self.scattering_type
    }
}

impl CategoryItem for ExperimentType {
    fn core(&self) -> &CategoryCore {
        &self.core
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_text_round_trip() {
        assert_eq!("time-of-flight".parse::<BeamMode>().unwrap(), BeamMode::TimeOfFlight);
        assert_eq!(SampleForm::SingleCrystal.to_string(), "single crystal");
        assert!(matches!(
            "electron".parse::<RadiationProbe>(),
            Err(ModelError::UnknownValue { kind: "radiation probe", .. })
        ));
        assert_eq!(
            serde_json::to_string(&ScatteringType::Total).unwrap(),
            r#""total""#
        );
    }

    #[test]
    fn test_descriptors_are_fixed() {
        let expt_type = ExperimentType::powder_cwl_neutron().unwrap();
        expt_type.beam_mode_descriptor.set_value("time-of-flight").unwrap();

        assert_eq!(
            expt_type.beam_mode_descriptor.text().as_deref(),
            Some("constant wavelength")
        );
        assert_eq!(expt_type.beam_mode(), BeamMode::ConstantWavelength);
        assert_eq!(expt_type.attributes().len(), 4);
        assert!(expt_type.parameters().is_empty());
    }
}
