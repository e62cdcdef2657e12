use crate::parameters::descriptor::DescriptorRef;
use crate::parameters::parameter::ParameterRef;

/// Either kind of value cell a category item can own
#[derive(Debug, Clone)]
pub enum Attribute {
    Descriptor(DescriptorRef),
    Parameter(ParameterRef),
}

impl Attribute {
    pub fn name(&self) -> String {
        match self {
            Attribute::Descriptor(d) => d.name(),
            Attribute::Parameter(p) => p.name(),
        }
    }

    pub fn uid(&self) -> String {
        match self {
            Attribute::Descriptor(d) => d.uid(),
            Attribute::Parameter(p) => p.uid(),
        }
    }

    pub fn cif_names(&self) -> Vec<String> {
        match self {
            Attribute::Descriptor(d) => d.cif_names(),
            Attribute::Parameter(p) => p.cif_names(),
        }
    }

    pub fn as_parameter(&self) -> Option<&ParameterRef> {
        match self {
            Attribute::Parameter(p) => Some(p),
            Attribute::Descriptor(_) => None,
        }
    }

    pub fn as_descriptor(&self) -> Option<&DescriptorRef> {
        match self {
            Attribute::Descriptor(d) => Some(d),
            Attribute::Parameter(_) => None,
        }
    }
}

impl From<ParameterRef> for Attribute {
    fn from(p: ParameterRef) -> Self {
        Attribute::Parameter(p)
    }
}

impl From<DescriptorRef> for Attribute {
    fn from(d: DescriptorRef) -> Self {
        Attribute::Descriptor(d)
    }
}
