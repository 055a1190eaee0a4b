//! Built-in migrations for the Element component library.
//!
//! Each function builds a fresh value; nothing here is global.

use super::{
    AttributeRename, Catalog, ClassTokenRewrite, ElementRename, Instruction, Migration, Pattern,
    PatternReplacement, PatternRule, PropertyMapping, PropertyReplacement, PropertyRename,
    ReplaceWith, Rename, SymbolRemoval, SymbolRename, TypeBasedPropertyRewrite,
};
use crate::error::{MigrationError, Result};

const BARRELS: &[&str] = &["@simpl/element-ng", "@siemens/element-ng"];

/// Names of the built-in migrations, in listing order.
pub const MIGRATIONS: &[&str] = &["element-v49", "from-next", "to-legacy"];

// Every pattern below is a literal that is known to compile.
fn pattern(source: &str) -> Pattern {
    match Pattern::new(source) {
        Ok(pattern) => pattern,
        Err(e) => panic!("built-in pattern {:?} does not compile: {}", source, e),
    }
}

fn element_module(sub: &str) -> Pattern {
    pattern(&format!(r"@(siemens|simpl)/element-ng(/{})?", sub))
}

fn symbol_rename(module: Pattern, to_module: Option<&str>, renames: &[(&str, &str)]) -> Instruction {
    Instruction::SymbolRename(SymbolRename {
        module,
        to_module: to_module.map(str::to_string),
        barrel_modules: BARRELS.iter().map(|b| b.to_string()).collect(),
        symbol_renamings: renames.iter().map(|(from, to)| Rename::new(from, to)).collect(),
    })
}

fn element_rename(from: &str, to: &str) -> Instruction {
    Instruction::ElementRename(ElementRename {
        replace: from.to_string(),
        replace_with: to.to_string(),
        default_attributes: Vec::new(),
    })
}

fn attribute_rename(from: &str, to: &str) -> Instruction {
    Instruction::AttributeRename(AttributeRename {
        replace: from.to_string(),
        replace_with: to.to_string(),
    })
}

fn removal(sub: &str, element: &str, attribute: Option<&str>, names: &[&str]) -> Instruction {
    Instruction::SymbolRemoval(SymbolRemoval {
        module: Some(element_module(sub)),
        element_selector: element.to_string(),
        attribute_selector: attribute.map(str::to_string),
        names: names.iter().map(|n| n.to_string()).collect(),
    })
}

fn classes(required: &[&str], excluded: &[&str], remove: &[&str], add: &[&str]) -> Instruction {
    let owned = |list: &[&str]| list.iter().map(|c| c.to_string()).collect::<Vec<_>>();
    Instruction::ClassTokenRewrite(ClassTokenRewrite {
        required_classes: owned(required),
        excluded_classes: owned(excluded),
        remove_classes: owned(remove),
        add_classes: owned(add),
    })
}

fn rules(pairs: &[(&str, &str)]) -> Vec<PatternRule> {
    pairs
        .iter()
        .map(|(p, r)| PatternRule { pattern: pattern(p), replacement: r.to_string() })
        .collect()
}

const BREAKPOINTS: &[(&str, &str)] = &[
    ("isXs", "xs"),
    ("isSm", "sm"),
    ("isMd", "md"),
    ("isLg", "lg"),
    ("isXl", "xl"),
    ("isXxl", "xxl"),
];

fn symbol_catalog_v49() -> Catalog {
    Catalog::new(
        "symbols",
        vec![
            symbol_rename(
                pattern(r"@(siemens|simpl)/dashboards-ng"),
                None,
                &[("CONFIG_TOKEN", "SI_DASHBOARD_CONFIGURATION")],
            ),
            symbol_rename(
                element_module("toast-notification"),
                Some("@siemens/element-ng/common"),
                &[("ToastStateName", "StatusType")],
            ),
            symbol_rename(
                element_module("(info-page|unauthorized-page)"),
                Some("@siemens/element-ng/info-page"),
                &[("SiUnauthorizedPageComponent", "SiInfoPageComponent")],
            ),
            symbol_rename(
                pattern(r"@siemens/charts-ng"),
                None,
                &[
                    ("SimplChartsNgModule", "SiChartsNgModule"),
                    ("SimplSeriesOption", "SiSeriesOption"),
                    ("SimplLineSeriesOption", "SiLineSeriesOption"),
                    ("SimplBarSeriesOption", "SiBarSeriesOption"),
                    ("SimplHeatmapSeriesOption", "SiHeatmapSeriesOption"),
                    ("SimplScatterSeriesOption", "SiScatterSeriesOption"),
                    ("SimplCandlestickSeriesOption", "SiCandlestickSeriesOption"),
                ],
            ),
            symbol_rename(
                pattern(r"@siemens/live-preview"),
                None,
                &[
                    ("SimplLivePreviewRoutingModule", "SiLivePreviewRoutingModule"),
                    ("SimplLivePreviewModule", "SiLivePreviewModule"),
                ],
            ),
            symbol_rename(
                pattern(r"@siemens/maps-ng"),
                None,
                &[("SimplMapsNgModule", "SiMapsNgModule")],
            ),
            symbol_rename(
                pattern(r"@siemens/native-charts-ng"),
                None,
                &[("SimplNativeChartsNgModule", "SiNativeChartsNgModule")],
            ),
        ],
    )
    .with_version("49")
}

fn markup_catalog_v49() -> Catalog {
    Catalog::new(
        "markup",
        vec![
            Instruction::PropertyRename(PropertyRename {
                module: Some(element_module("accordion")),
                element_selector: "si-collapsible-panel".to_string(),
                property_mappings: vec![PropertyMapping {
                    replace: "(toggle)".to_string(),
                    replace_with: ReplaceWith::from("(panelToggle)"),
                }],
            }),
            removal("accordion", "si-accordion", None, &["colorVariant"]),
            removal("datepicker", "input", Some("siDateInput"), &["dateInputDebounceTime"]),
            removal("datepicker", "input", Some("siDatepicker"), &["triggeringInput"]),
            removal("datepicker", "si-date-range", None, &["debounceTime"]),
            removal("filtered-search", "si-filtered-search", None, &["showIcon", "noMatchingCriteriaText"]),
            removal("form", "si-form-item", None, &["inputId", "readonly"]),
            removal("navbar-vertical", "si-navbar-vertical", None, &["autoCollapseDelay"]),
            removal("split", "si-split-part", None, &["headerStatusColor", "headerStatusIconClass"]),
            removal("tree-view", "si-tree-view", None, &["disableFilledIcons", "trackByFunction"]),
            Instruction::SymbolRemoval(SymbolRemoval {
                module: Some(pattern(r"@(siemens|simpl)/charts-ng")),
                element_selector: "si-chart-gauge".to_string(),
                attribute_selector: None,
                names: vec!["numberOfDecimals".to_string()],
            }),
        ],
    )
    .with_version("49")
}

fn class_catalog_v49() -> Catalog {
    Catalog::new(
        "element-classes",
        vec![
            classes(&["btn", "btn-circle", "btn-sm"], &[], &["btn-sm"], &[]),
            classes(&["btn", "btn-circle", "btn-xs"], &[], &["btn-xs"], &["btn-sm"]),
            classes(&["btn", "btn-circle"], &["btn-lg", "btn-sm", "btn-xs"], &[], &["btn-lg"]),
            classes(&["btn", "btn-xs"], &["btn-circle"], &["btn-xs"], &["btn-sm"]),
        ],
    )
    .with_version("49")
}

fn class_member_catalog_v49() -> Catalog {
    Catalog::new(
        "class-members",
        vec![Instruction::TypeBasedPropertyRewrite(TypeBasedPropertyRewrite {
            module: element_module("resize-observer"),
            type_names: vec!["SiResponsiveContainerDirective".to_string()],
            property_replacements: BREAKPOINTS
                .iter()
                .map(|(property, signal)| PropertyReplacement {
                    property: property.to_string(),
                    replacement: format!("${{expression}}.{}()", signal),
                })
                .collect(),
        })],
    )
    .with_version("49")
}

fn pattern_catalog_v49() -> Catalog {
    let breakpoints: Vec<(String, String)> = BREAKPOINTS
        .iter()
        .map(|(property, signal)| (format!(r"\.{}\b", property), format!(".{}()", signal)))
        .collect();
    let breakpoint_pairs: Vec<(&str, &str)> =
        breakpoints.iter().map(|(p, r)| (p.as_str(), r.as_str())).collect();

    Catalog::new(
        "patterns",
        vec![
            Instruction::PatternReplacement(PatternReplacement {
                module: element_module("filtered-search"),
                requires_symbols: vec![
                    "Criterion".to_string(),
                    "CriterionValue".to_string(),
                    "CriterionDefinition".to_string(),
                ],
                patterns: rules(&[
                    (r"\bCriterionValue\s*\|\s*Criterion\b", "CriterionValue"),
                    (r"\bCriterion\s*\|\s*CriterionValue\b", "CriterionValue"),
                    (r"\bCriterion\[\]\s*\|\s*CriterionDefinition\[\]", "CriterionDefinition[]"),
                    (r"\bCriterionDefinition\[\]\s*\|\s*Criterion\[\]", "CriterionDefinition[]"),
                    (r"\bCriterionValue\s*&\s*Criterion\b", "CriterionValue"),
                    (r"\bCriterion\s*&\s*CriterionValue\b", "CriterionValue"),
                    (r"\bCriterion\[\]\s*&\s*CriterionDefinition\[\]", "CriterionDefinition[]"),
                    (r"\bCriterionDefinition\[\]\s*&\s*Criterion\[\]", "CriterionDefinition[]"),
                ]),
            }),
            Instruction::PatternReplacement(PatternReplacement {
                module: element_module("resize-observer"),
                requires_symbols: vec!["SiResponsiveContainerDirective".to_string()],
                patterns: rules(&breakpoint_pairs),
            }),
            // initialState only inside `.show(Component, { ... })` calls
            Instruction::PatternReplacement(PatternReplacement {
                module: element_module("modal"),
                requires_symbols: vec!["SiModalService".to_string()],
                patterns: rules(&[(
                    r"(?s)(\bshow\([^)]*,\s*\{[^}]*\b)(initialState)(\s*:)",
                    "${1}inputValues${3}",
                )]),
            }),
        ],
    )
    .with_version("49")
}

pub fn element_v49() -> Migration {
    Migration {
        name: "element-v49".to_string(),
        description: "Element v48 to v49: renamed symbols, removed inputs, button classes, \
                      responsive container signals and modal inputs"
            .to_string(),
        catalogs: vec![
            symbol_catalog_v49(),
            markup_catalog_v49(),
            class_catalog_v49(),
            class_member_catalog_v49(),
            pattern_catalog_v49(),
        ],
    }
}

/// Shared shape of the `from-next` and `to-legacy` migrations.
struct ComponentSwap<'a> {
    symbols: &'a [(&'a str, Option<&'a str>, &'a [(&'a str, &'a str)])],
    elements: &'a [(&'a str, &'a str)],
    attributes: &'a [(&'a str, &'a str)],
}

fn component_swap(name: &str, description: &str, swap: ComponentSwap<'_>) -> Migration {
    let symbols = swap
        .symbols
        .iter()
        .map(|(sub, to_module, renames)| symbol_rename(element_module(sub), *to_module, renames))
        .collect();
    let markup = swap
        .elements
        .iter()
        .map(|(from, to)| element_rename(from, to))
        .chain(swap.attributes.iter().map(|(from, to)| attribute_rename(from, to)))
        .collect();

    Migration {
        name: name.to_string(),
        description: description.to_string(),
        catalogs: vec![Catalog::new("symbols", symbols), Catalog::new("markup", markup)],
    }
}

pub fn from_next() -> Migration {
    component_swap(
        "from-next",
        "Promote the *-next icon, tabs and popover components to their current names",
        ComponentSwap {
            symbols: &[
                ("icon-next", None, &[("SiIconNextComponent", "SiIconComponent")]),
                (
                    "tabs-next",
                    Some("@siemens/element-ng/tabs"),
                    &[
                        ("SiTabNextComponent", "SiTabComponent"),
                        ("SiTabsetNextComponent", "SiTabsetComponent"),
                        ("SiTabsNextModule", "SiTabsModule"),
                    ],
                ),
                (
                    "popover-next",
                    Some("@siemens/element-ng/popover"),
                    &[
                        ("SiPopoverNextDirective", "SiPopoverDirective"),
                        ("SiPopoverNextModule", "SiPopoverModule"),
                    ],
                ),
            ],
            elements: &[
                ("si-icon-next", "si-icon"),
                ("si-tabset-next", "si-tabset"),
                ("si-tab-next", "si-tab"),
            ],
            attributes: &[("siPopoverNext", "siPopover")],
        },
    )
}

pub fn to_legacy() -> Migration {
    component_swap(
        "to-legacy",
        "Move the current icon, tabs and popover components to their legacy names",
        ComponentSwap {
            symbols: &[
                ("icon", None, &[("SiIconComponent", "SiIconLegacyComponent")]),
                (
                    "tabs",
                    Some("@siemens/element-ng/tabs-legacy"),
                    &[
                        ("SiTabComponent", "SiTabLegacyComponent"),
                        ("SiTabsetComponent", "SiTabsetLegacyComponent"),
                        ("SiTabsModule", "SiTabsLegacyModule"),
                    ],
                ),
                (
                    "popover",
                    Some("@siemens/element-ng/popover-legacy"),
                    &[
                        ("SiPopoverDirective", "SiPopoverLegacyDirective"),
                        ("SiPopoverModule", "SiPopoverLegacyModule"),
                    ],
                ),
            ],
            elements: &[
                ("si-icon", "si-icon-legacy"),
                ("si-tabset", "si-tabset-legacy"),
                ("si-tab", "si-tab-legacy"),
            ],
            attributes: &[("siPopover", "siPopoverLegacy")],
        },
    )
}

/// Look up a built-in migration, suggesting the closest name on a miss.
pub fn find(name: &str) -> Result<Migration> {
    match name {
        "element-v49" => Ok(element_v49()),
        "from-next" => Ok(from_next()),
        "to-legacy" => Ok(to_legacy()),
        _ => {
            let suggestion = MIGRATIONS
                .iter()
                .map(|candidate| (candidate, strsim::jaro_winkler(name, candidate)))
                .filter(|(_, score)| *score > 0.7)
                .max_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(candidate, _)| format!(", did you mean '{}'?", candidate))
                .unwrap_or_default();
            Err(MigrationError::Catalog {
                name: name.to_string(),
                message: format!(
                    "unknown migration (available: {}){}",
                    MIGRATIONS.join(", "),
                    suggestion
                ),
            })
        }
    }
}

pub fn all() -> Vec<Migration> {
    vec![element_v49(), from_next(), to_legacy()]
}
