use std::fmt;
use std::str::FromStr;

/// Lifecycle state shared by every soft-deletable entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Activo,
    Inactivo,
    Suspendido,
}

impl Status {
    pub const ALL: [Status; 3] = [Status::Activo, Status::Inactivo, Status::Suspendido];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Activo => "Activo",
            Status::Inactivo => "Inactivo",
            Status::Suspendido => "Suspendido",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Status::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!(
                    "Estado inválido. Estados válidos: {}",
                    Status::ALL.map(|s| s.as_str()).join(", ")
                )
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Disponible,
    Agotado,
    Descontinuado,
}

impl Availability {
    pub const ALL: [Availability; 3] = [
        Availability::Disponible,
        Availability::Agotado,
        Availability::Descontinuado,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Availability::Disponible => "Disponible",
            Availability::Agotado => "Agotado",
            Availability::Descontinuado => "Descontinuado",
        }
    }
}

impl FromStr for Availability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Availability::ALL
            .into_iter()
            .find(|a| a.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!(
                    "Disponibilidad inválida. Valores válidos: {}",
                    Availability::ALL.map(|a| a.as_str()).join(", ")
                )
            })
    }
}
