/// Closed category vocabulary seeded into a fresh database.
pub const DEFAULT_CATEGORIES: &[&str] = &[
    "OPEX - Office Supplies",
    "OPEX - Utilities",
    "OPEX - Rent or Lease Costs",
    "OPEX - Maintenance and Repairs",
    "OPEX - Transportation Costs",
    "CAPEX - Equipment Purchase",
    "CAPEX - Infrastructure Upgrades",
    "CAPEX - IT Hardware and Systems",
    "CAPEX - Furniture and Fixtures",
    "CAPEX - Real Estate Investments",
    "EE - Salaries and Wages",
    "EE - Employee Benefits",
    "EE - Training and Development",
    "EE - Recruitment Costs",
    "EE - Team Building Activities",
    "EE - Salary Increment Plan",
    "MKT - Digital Advertising",
    "MKT - Content Creation",
    "MKT - Event Sponsorships",
    "MKT - Trade Shows and Exhibitions",
    "MKT - Marketing Merchandise",
    "TEC - Software Subscriptions / SaaS Licenses",
    "TEC - IT Support Services",
    "TEC - Cybersecurity Tools",
    "COM - Regulatory Compliance Fees",
    "COM - Licenses and Permits",
    "COM - Legal Consultation Fees",
    "COM - Audit Services",
    "TEEX - Business Travel",
    "TEEX - Client Entertainment",
    "TEEX - Meals and Hospitality",
    "MISC - Contingency Funds",
    "MISC - Donations and Sponsorships",
    "MISC - Unexpected Expenses",
    "MISC - Miscellaneous Administrative Costs",
];

pub const DEFAULT_TEAMS: &[&str] = &[
    "Finance",
    "Marketing",
    "Business Development",
    "Strategy",
    "Product & Engineering",
    "People & Culture",
    "Account Management",
    "Compliance",
    "Solutions",
];

#[cfg(test)]
pub fn defaults(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Case-insensitive lookup returning the vocabulary's own spelling.
pub fn canonical<'a>(vocabulary: &'a [String], value: &str) -> Option<&'a str> {
    let needle = value.trim().to_lowercase();
    vocabulary
        .iter()
        .find(|entry| entry.to_lowercase() == needle)
        .map(String::as_str)
}
