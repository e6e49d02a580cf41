use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Two-letter jurisdiction code selecting the reference cost data (e.g. "SP").
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RegionCode(String);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegionError {
    #[error("region code must be two ASCII letters, got {0:?}")]
    Invalid(String),
}

impl RegionCode {
    pub fn parse(raw: &str) -> Result<Self, RegionError> {
        let trimmed = raw.trim();
        if trimmed.len() == 2 && trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(Self(trimmed.to_ascii_uppercase()))
        } else {
            Err(RegionError::Invalid(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RegionCode {
    fn default() -> Self {
        Self("SP".to_string())
    }
}

impl fmt::Display for RegionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RegionCode {
    type Err = RegionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RegionCode {
    type Error = RegionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RegionCode> for String {
    fn from(value: RegionCode) -> Self {
        value.0
    }
}

/// Contract shape taken from the tender notice.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScopeConfig {
    pub contract_months: u32,
    pub monthly_hours: f64,
    /// Monthly revenue ceiling; the calculation assumes no contract amendments.
    pub revenue_cap: f64,
    pub has_operator: bool,
    pub has_fuel: bool,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            contract_months: 12,
            monthly_hours: 200.0,
            revenue_cap: 45_000.0,
            has_operator: true,
            has_fuel: true,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ScopeError {
    #[error("contract duration must be at least one month")]
    ZeroMonths,
    #[error("{field} must be a finite number, got {value}")]
    NotFinite { field: &'static str, value: f64 },
    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: f64 },
}

impl ScopeConfig {
    pub fn validate(&self) -> Result<(), ScopeError> {
        if self.contract_months == 0 {
            return Err(ScopeError::ZeroMonths);
        }
        for (field, value) in [
            ("monthly hours", self.monthly_hours),
            ("revenue cap", self.revenue_cap),
        ] {
            if !value.is_finite() {
                return Err(ScopeError::NotFinite { field, value });
            }
            if value < 0.0 {
                return Err(ScopeError::Negative { field, value });
            }
        }
        Ok(())
    }
}

/// Cost fields the user may override.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CostField {
    DieselPrice,
    OperatorSalary,
    MachineValue,
}

impl CostField {
    pub const ALL: [CostField; 3] = [
        CostField::DieselPrice,
        CostField::OperatorSalary,
        CostField::MachineValue,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Self::DieselPrice => "dieselPrice",
            Self::OperatorSalary => "operatorSalary",
            Self::MachineValue => "machineValue",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::DieselPrice => "Diesel (Litro)",
            Self::OperatorSalary => "Salário Base",
            Self::MachineValue => "Valor Máquina",
        }
    }
}

impl FromStr for CostField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "diesel" | "dieselprice" | "diesel_price" => Ok(Self::DieselPrice),
            "salary" | "operatorsalary" | "operator_salary" => Ok(Self::OperatorSalary),
            "machine" | "machinevalue" | "machine_value" => Ok(Self::MachineValue),
            other => Err(format!("unknown cost field: {other}")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CostParameter {
    pub system_value: f64,
    pub user_value: f64,
}

impl CostParameter {
    pub fn from_system(value: f64) -> Self {
        Self {
            system_value: value,
            user_value: value,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CostParameterSet {
    pub diesel_price: CostParameter,
    pub operator_salary: CostParameter,
    pub machine_value: CostParameter,
    /// Fraction applied on top of the base salary (0.85 = 85%).
    pub social_charges_rate: f64,
    /// Litres per operating hour.
    pub fuel_consumption_rate: f64,
    /// Fraction of machine value spent on maintenance per year.
    pub maintenance_rate: f64,
}

impl CostParameterSet {
    pub fn get(&self, field: CostField) -> &CostParameter {
        match field {
            CostField::DieselPrice => &self.diesel_price,
            CostField::OperatorSalary => &self.operator_salary,
            CostField::MachineValue => &self.machine_value,
        }
    }

    pub fn get_mut(&mut self, field: CostField) -> &mut CostParameter {
        match field {
            CostField::DieselPrice => &mut self.diesel_price,
            CostField::OperatorSalary => &mut self.operator_salary,
            CostField::MachineValue => &mut self.machine_value,
        }
    }

    /// Copy of this set with every user value reset to its system value.
    pub fn system_defaults(&self) -> Self {
        let mut reset = self.clone();
        for field in CostField::ALL {
            let param = reset.get_mut(field);
            param.user_value = param.system_value;
        }
        reset
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl RiskLevel {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "Baixa",
            Self::Medium => "Média",
            Self::High => "Alta",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Low => "Limpeza, Pátio",
            Self::Medium => "Obra Civil, Terraplanagem",
            Self::High => "Pedreira, 24h, Demolição",
        }
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(format!("unknown risk level: {other}")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskStatus {
    Danger,
    Warning,
    Safe,
}

impl RiskStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Danger => "CRÍTICO",
            Self::Warning => "ALERTA",
            Self::Safe => "VIÁVEL",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Danger => "Margem projetada insuficiente para cobrir riscos operacionais.",
            Self::Warning => "Margem apertada. Sensível a variações de manutenção.",
            Self::Safe => "Operação com margem saudável de segurança.",
        }
    }
}

/// Paid-access flag supplied by the account backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Entitlement {
    #[default]
    Free,
    Premium,
}

impl Entitlement {
    pub fn from_premium(is_premium: bool) -> Self {
        if is_premium {
            Self::Premium
        } else {
            Self::Free
        }
    }

    pub fn is_premium(&self) -> bool {
        matches!(self, Self::Premium)
    }
}
