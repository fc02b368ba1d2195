use std::sync::Arc;

use lazy_static::lazy_static;

use crate::models::{AdvisorPersona, AdvisorProfile, Script, Section, SectionKind};

pub const MICHAEL_RODRIGUEZ: &str = "michael-rodriguez";
pub const SARAH_CHEN: &str = "sarah-chen";

// Roster of selectable advisors, backed by built-in content
pub struct Roster {
    personas: Vec<AdvisorPersona>,
}

lazy_static! {
    static ref BUILTIN_ROSTER: Arc<Roster> = Arc::new(Roster::new(get_all_advisors()));
}

impl Roster {
    pub fn get_instance() -> Arc<Roster> {
        BUILTIN_ROSTER.clone()
    }

    pub fn new(personas: Vec<AdvisorPersona>) -> Self {
        Self { personas }
    }

    pub fn all(&self) -> &[AdvisorPersona] {
        &self.personas
    }

    pub fn get(&self, id: &str) -> Option<&AdvisorPersona> {
        self.personas.iter().find(|persona| persona.id == id)
    }

    /// Looks up by id, or by display name ignoring case.
    pub fn find(&self, key: &str) -> Option<&AdvisorPersona> {
        self.get(key).or_else(|| {
            self.personas
                .iter()
                .find(|persona| persona.name.eq_ignore_ascii_case(key.trim()))
        })
    }

    pub fn script_for(&self, id: &str) -> Option<Arc<Script>> {
        self.get(id).and_then(|persona| persona.script.clone())
    }

    /// Advisors that have content to generate.
    pub fn scripted(&self) -> impl Iterator<Item = &AdvisorPersona> {
        self.personas.iter().filter(|persona| persona.has_script())
    }
}

// Function to get all advisors with their built-in content
pub fn get_all_advisors() -> Vec<AdvisorPersona> {
    vec![
        AdvisorPersona {
            id: MICHAEL_RODRIGUEZ.to_string(),
            name: "Michael Rodriguez".to_string(),
            product_focus: Some("Active Fixed-Income ETFs".to_string()),
            profile: Some(AdvisorProfile {
                firm: "Morgan Stanley".to_string(),
                licenses: vec![
                    "Series 7".to_string(),
                    "Series 66".to_string(),
                    "CFP".to_string(),
                ],
                product_interest: "Active ETFs".to_string(),
                investment_strategy:
                    "Dynamic asset allocation with focus on sector rotation and momentum investing"
                        .to_string(),
                experience: "12 years".to_string(),
                specialization: "High-net-worth clients".to_string(),
            }),
            script: Some(Arc::new(create_michael_rodriguez_script())),
        },
        AdvisorPersona {
            id: SARAH_CHEN.to_string(),
            name: "Sarah Chen".to_string(),
            product_focus: Some("ETF Tax Efficiency".to_string()),
            profile: Some(AdvisorProfile {
                firm: "UBS".to_string(),
                licenses: vec![
                    "Series 7".to_string(),
                    "Series 63".to_string(),
                    "CFA".to_string(),
                ],
                product_interest: "ETF Tax Efficiency".to_string(),
                investment_strategy: "Tax-optimized portfolio construction with emphasis on low-cost indexing and tax-loss harvesting".to_string(),
                experience: "15 years".to_string(),
                specialization: "Tax-efficient investing".to_string(),
            }),
            script: Some(Arc::new(create_sarah_chen_script())),
        },
        AdvisorPersona::new("david-thompson", "David Thompson"),
        AdvisorPersona::new("emily-johnson", "Emily Johnson"),
        AdvisorPersona::new("robert-williams", "Robert Williams"),
        AdvisorPersona::new("lisa-anderson", "Lisa Anderson"),
    ]
}

fn create_michael_rodriguez_script() -> Script {
    Script::new(vec![
        Section::new(
            "hero",
            SectionKind::Hero,
            "Why Lean into Manulife's Active Fixed‑Income ETFs",
            &[
                r#"Explore how <a href="https://www.manulifeim.com/retail/ca/en/investments/etf/manulife-smart-core-bond-etf-a-bskt" target="_blank" rel="noopener noreferrer" class="underline font-semibold">BSKT</a>, <a href="https://www.manulifeim.com/retail/ca/en/investments/etf/manulife-smart-corporate-bond-etf-a-cbnd" target="_blank" rel="noopener noreferrer" class="underline font-semibold">CBND</a> and <a href="https://www.manulifeim.com/retail/ca/en/investments/etf/manulife-smart-short-term-bond-etf-a-term" target="_blank" rel="noopener noreferrer" class="underline font-semibold">TERM</a> combine the ETF structure with Manulife's active fixed‑income research to pursue tax‑aware income, competitive execution, and real‑time flexibility."#,
            ],
        ),
        Section::new(
            "inkind",
            SectionKind::Body,
            "In‑Kind Creation & Redemption",
            &[
                "Potential tax efficiency — exchange‑level trading and primary‑market in‑kind activity can reduce fund‑level capital‑gains distributions.",
                "Lower trading frictions — authorized‑participant flows can help limit forced selling, supporting NAV.",
                "Cash‑flow management — portfolios can stay more fully invested, reducing cash drag.",
                r#"Tax‑aware outcomes — <a href="https://www.manulifeim.com/retail/ca/en/investments/etf/manulife-smart-core-bond-etf-a-bskt" target="_blank" rel="noopener noreferrer" class="underline">BSKT</a>, <a href="https://www.manulifeim.com/retail/ca/en/investments/etf/manulife-smart-corporate-bond-etf-a-cbnd" target="_blank" rel="noopener noreferrer" class="underline">CBND</a>, <a href="https://www.manulifeim.com/retail/ca/en/investments/etf/manulife-smart-short-term-bond-etf-a-term" target="_blank" rel="noopener noreferrer" class="underline">TERM</a> leverage ETF structure for tax‑efficient income."#,
            ],
        ),
        Section::new(
            "liquidity",
            SectionKind::Body,
            "Intraday Liquidity",
            &[
                "Real‑Time Shifts — adjust duration/credit throughout the day, not just at 4 p.m.",
                "Price Discovery — live bids offer transparency in volatile bond markets.",
                r#"Flexible cash — park functional cash in <a href="https://www.manulifeim.com/retail/ca/en/investments/etf/manulife-smart-short-term-bond-etf-a-term" target="_blank" rel="noopener noreferrer" class="underline">TERM</a> and redeploy as opportunities arise."#,
                "Hedging Agility — enter/exit tactical positions around Fed announcements.",
                "Bid‑Ask Control — scale orders to capture tighter spreads.",
            ],
        ),
        Section::new(
            "research",
            SectionKind::Body,
            "Research‑Driven Security Selection",
            &[
                r#"Beyond the broad market — active mandates in <a href="https://www.manulifeim.com/retail/ca/en/investments/etf/manulife-smart-core-bond-etf-a-bskt" target="_blank" rel="noopener noreferrer" class="underline">BSKT</a> and <a href="https://www.manulifeim.com/retail/ca/en/investments/etf/manulife-smart-corporate-bond-etf-a-cbnd" target="_blank" rel="noopener noreferrer" class="underline">CBND</a> enable sector rotation and selective credit exposure."#,
                "Research insights — Manulife's fixed income research team informs sector rotation and credit selection.",
                "Risk Budgeting — disciplined use of duration, curve and sector tilts to pursue excess return.",
                "Portfolio construction — leverage Manulife's research capabilities for enhanced security selection.",
                "Active Management — combine the benefits of ETF structure with professional portfolio management.",
            ],
        ),
        Section::new(
            "cta",
            SectionKind::CallToAction,
            "Ready to Bring Active Precision & Tax-Aware Efficiency to Your Bond Sleeve?",
            &[
                r#"Explore <a href="https://www.manulifeim.com/retail/ca/en/investments/etf/manulife-smart-core-bond-etf-a-bskt" target="_blank" rel="noopener noreferrer" class="underline font-semibold">BSKT</a>, <a href="https://www.manulifeim.com/retail/ca/en/investments/etf/manulife-smart-corporate-bond-etf-a-cbnd" target="_blank" rel="noopener noreferrer" class="underline font-semibold">CBND</a> and <a href="https://www.manulifeim.com/retail/ca/en/investments/etf/manulife-smart-short-term-bond-etf-a-term" target="_blank" rel="noopener noreferrer" class="underline font-semibold">TERM</a> to see how they may fit in client portfolios."#,
            ],
        ),
    ])
}

fn create_sarah_chen_script() -> Script {
    Script::new(vec![
        Section::new(
            "hero",
            SectionKind::Hero,
            "ETF Tax Efficiency Explained",
            &[
                "See how exchange‑traded mechanics—secondary‑market trading and in‑kind primary‑market flows—can help ETFs deliver tax‑aware outcomes.",
            ],
        ),
        Section::new(
            "overview",
            SectionKind::Body,
            "How ETF Structure Drives Tax Efficiency",
            &[
                "Most ETF shares change hands on the exchange through secondary‑market trading, so the fund typically doesn’t sell holdings to meet redemptions.",
                "When creations/redemptions occur directly with the ETF, securities can be delivered in‑kind, allocating gains to the redeemer instead of remaining unitholders.",
                "Managers can focus on portfolio construction rather than managing daily cash flows, potentially improving tax outcomes.",
            ],
        ),
        Section::new(
            "levers",
            SectionKind::Body,
            "Two Structural Levers",
            &[
                "No forced fund sales — most investor trades occur on‑exchange between buyers and sellers, so the fund typically doesn’t sell holdings to meet redemptions.",
                "Lower turnover — fewer fund‑level trades can mean fewer realized gains to distribute.",
                "Transparent pricing — live bids/asks aid price discovery, especially in bond ETFs.",
                "Liquidity buffer — reduces pressure on underlying markets during stress.",
                "Cap‑gains mitigation — when creations/redemptions occur directly with the ETF, securities can be delivered in‑kind, allocating gains to the redeemer instead of remaining unitholders.",
                "Cost efficiency — can help avoid commissions/market‑impact from selling positions.",
                r#"Portfolio housekeeping — managers may "hand off" low‑basis lots without triggering broad distributions."#,
                "Active, too — the structure supports tax‑aware active ETFs as well as index ETFs.",
            ],
        ),
        Section::new(
            "myths",
            SectionKind::Body,
            "Busting the Myths",
            &[
                "Myth 1: Only passive ETFs are tax efficient - Reality: structure matters. Manulife notes that ETF operations can lead to lower taxable distributions than traditional mutual fund trusts, and this applies to both index and systematically managed active approaches.",
                "Myth 2: ETFs don’t belong in taxable accounts - Reality: many investors use ETFs effectively in taxable accounts. Fit depends on the mix of income types, holding period, and asset‑location strategy. Review distribution histories and consider loss‑harvesting where appropriate.",
            ],
        ),
        Section::new(
            "usecases",
            SectionKind::Body,
            "Five Advisor Use Cases",
            &[
                r#"ETF‑to‑ETF tax‑loss harvesting <a href="https://www.manulifeim.com/retail/ca/en/landing-page/etfs" target="_blank" rel="noopener noreferrer" class="underline">(scan lineup)</a>"#,
                r#"Short‑term cash parking with <a href="https://www.manulifeim.com/retail/ca/en/investments/etf/manulife-smart-short-term-bond-etf-a-term" target="_blank" rel="noopener noreferrer" class="underline">TERM</a>"#,
                r#"Global bond sleeve via <a href="https://www.manulifeim.com/content/dam/mim-ca/landing-page/product/pdf/manulife-smart-global-bond-etf-en.pdf" target="_blank" rel="noopener noreferrer" class="underline">GBND</a>"#,
                r#"Core‑satellite reallocations with <a href="https://www.manulifeim.com/retail/ca/en/investments/etf/manulife-smart-core-bond-etf-a-bskt" target="_blank" rel="noopener noreferrer" class="underline">BSKT</a>"#,
                r#"Year‑end distribution planning <a href="https://www.manulifeim.com/retail/ca/en/landing-page/distributions/exchange-traded-funds" target="_blank" rel="noopener noreferrer" class="underline">(distribution history)</a>"#,
            ],
        ),
        Section::new(
            "cta",
            SectionKind::CallToAction,
            "Want to See Distribution Details?",
            &[
                "Review Manulife’s ETF distribution breakdowns and recent cash distribution notices to plan tax‑aware portfolios.",
            ],
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::{self, LinkTokens};

    #[test]
    fn test_builtin_roster() {
        let roster = Roster::get_instance();
        assert_eq!(roster.all().len(), 6);
        assert_eq!(roster.scripted().count(), 2);

        let michael = roster.get(MICHAEL_RODRIGUEZ).unwrap();
        assert_eq!(michael.script.as_ref().unwrap().len(), 5);
        assert_eq!(michael.firm(), Some("Morgan Stanley"));

        let sarah = roster.get(SARAH_CHEN).unwrap();
        assert_eq!(sarah.script.as_ref().unwrap().len(), 6);
        assert_eq!(sarah.firm(), Some("UBS"));

        assert!(roster.script_for("lisa-anderson").is_none());
    }

    #[test]
    fn test_find_by_name() {
        let roster = Roster::get_instance();
        assert_eq!(roster.find("sarah chen").unwrap().id, SARAH_CHEN);
        assert_eq!(roster.find(MICHAEL_RODRIGUEZ).unwrap().name, "Michael Rodriguez");
        assert!(roster.find("nobody").is_none());
    }

    #[test]
    fn test_section_layout() {
        let script = Roster::get_instance().script_for(SARAH_CHEN).unwrap();
        let ids: Vec<&str> = script.sections.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["hero", "overview", "levers", "myths", "usecases", "cta"]);
        assert_eq!(script.sections[0].kind, SectionKind::Hero);
        assert_eq!(script.sections[5].kind, SectionKind::CallToAction);
        assert_eq!(script.sections[2].content.len(), 8);
    }

    #[test]
    fn test_use_case_links_count_as_single_words() {
        let script = Roster::get_instance().script_for(SARAH_CHEN).unwrap();
        let usecases = &script.sections[4];
        // "Short‑term cash parking with <a ...>TERM</a>"
        assert_eq!(tokenizer::word_count(&usecases.content[1], LinkTokens::Atomic), 5);
        assert!(tokenizer::word_count(&usecases.content[1], LinkTokens::Whitespace) > 5);
    }
}
