//! Frozen audit-report snapshot and its plain-text rendering.

use std::fmt::Write as _;

use serde::Serialize;
use thiserror::Error;
use time::{macros::format_description, OffsetDateTime};
use uuid::Uuid;

use super::{
    entities::{CostField, CostParameterSet, RegionCode, RiskLevel, ScopeConfig},
    evaluation::CalculationResult,
};
use crate::util::{format::format_brl, version::build_label};

#[derive(Debug, Error, PartialEq)]
pub enum ReportError {
    #[error("reports require a premium account")]
    NotEntitled,
    #[error("no calculation result is available")]
    ResultUnavailable,
    #[error("report locked: projected margin {margin_percent:.1}% is critical")]
    CriticalRisk { margin_percent: f64 },
}

/// Everything a report needs, copied out of the session at generation time.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReportSnapshot {
    pub audit_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub generated_at: OffsetDateTime,
    pub region: RegionCode,
    pub risk_level: RiskLevel,
    pub scope: ScopeConfig,
    pub costs: CostParameterSet,
    pub overrides: Vec<CostField>,
    pub result: CalculationResult,
}

impl ReportSnapshot {
    /// Short uppercase audit reference printed in the header.
    pub fn audit_reference(&self) -> String {
        self.audit_id.simple().to_string()[..9].to_ascii_uppercase()
    }

    pub fn file_name(&self) -> String {
        let date = self
            .generated_at
            .format(format_description!("[year]-[month]-[day]"))
            .unwrap_or_else(|_| "undated".to_string());
        format!("BidGuard_Analise_{}_{}.txt", self.region, date)
    }

    pub fn render_text(&self) -> String {
        let date = self
            .generated_at
            .format(format_description!("[day]/[month]/[year]"))
            .unwrap_or_default();
        let result = &self.result;
        let mut out = String::new();

        // Writing into a String cannot fail.
        let _ = writeln!(out, "BidGuard Audit");
        let _ = writeln!(out, "Relatório de Viabilidade Econômico-Operacional");
        let _ = writeln!(out, "Data: {date}");
        let _ = writeln!(out, "Base de Dados: {} (Ref. ANP/Sindicatos)", self.region);
        let _ = writeln!(out, "ID Auditoria: {}", self.audit_reference());
        let _ = writeln!(out);

        let _ = writeln!(out, "NÍVEL DE RISCO IDENTIFICADO: {}", result.status.label());
        let _ = writeln!(out, "{}", result.status.description());
        let _ = writeln!(
            out,
            "Nível de exigência: {} ({})",
            self.risk_level.label(),
            self.risk_level.description()
        );
        let _ = writeln!(out);

        let _ = writeln!(
            out,
            "NOTA METODOLÓGICA (Pior Cenário): Este cálculo não utiliza médias simples. \
             A metodologia considera o topo do intervalo de custos e aplica fatores de \
             stress operacional para proteção do caixa."
        );
        let _ = writeln!(out);

        let _ = writeln!(out, "1. Resumo da Simulação");
        let rows = [
            (
                "Receita Teto Mensal (Edital)",
                format_brl(self.scope.revenue_cap),
            ),
            (
                "Custo Operacional Total (Mês)",
                format!("- {}", format_brl(result.total_monthly_cost)),
            ),
            (
                "Resultado Operacional Projetado",
                format!(
                    "{} ({:.1}%)",
                    format_brl(result.projected_profit),
                    result.margin_percent
                ),
            ),
            (
                "Ponto de Equilíbrio (Break-Even)",
                format!("{} / hora", format_brl(result.hourly_break_even)),
            ),
            (
                "Resultado no Contrato",
                format!(
                    "{} ({} meses)",
                    format_brl(result.total_contract_profit),
                    self.scope.contract_months
                ),
            ),
        ];
        for (label, value) in rows {
            let _ = writeln!(out, "  {label:<36}{value:>28}");
        }
        let _ = writeln!(out);

        let _ = writeln!(out, "2. Auditoria de Custos (Base x Real)");
        let _ = writeln!(
            out,
            "  {:<20}{:>22}{:>22}  {}",
            "Item de Custo",
            format!("Ref. Sistema ({})", self.region),
            "Valor Utilizado",
            "Status"
        );
        for field in CostField::ALL {
            let param = self.costs.get(field);
            let status = if self.overrides.contains(&field) {
                "EDITADO"
            } else {
                "PADRÃO"
            };
            let _ = writeln!(
                out,
                "  {:<20}{:>22}{:>22}  {}",
                field.label(),
                format_brl(param.system_value),
                format_brl(param.user_value),
                status
            );
        }
        let _ = writeln!(out);

        let _ = writeln!(
            out,
            "AVISO LEGAL DE SENSIBILIDADE: Variações relevantes no custo de combustível, \
             índices de manutenção corretiva ou alteração no regime de uso (horas efetivas) \
             podem impactar este resultado. Este relatório é uma simulação de viabilidade \
             econômica baseada em parâmetros fornecidos. O BidGuard não garante vitória em \
             licitações nem resultados financeiros futuros. A responsabilidade final pela \
             precificação é exclusivamente da empresa licitante."
        );
        let _ = writeln!(
            out,
            "Relatório gerado automaticamente pelo BidGuard System {}.",
            build_label()
        );
        out
    }
}
