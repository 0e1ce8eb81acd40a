// * Reference lists for name validation and role classification
// * Loaded once, shared as Arc<Lexicon>, never mutated while jobs run.

use crate::persistence::schema::SeniorityTier;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LexiconError {
    #[error("Failed to read lexicon file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse lexicon JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

const FIRST_NAMES: &[&str] = &[
    "aaron", "abigail", "adam", "adrian", "aidan", "alan", "alastair", "albert", "alex", "alexander",
    "alexandra", "alice", "alison", "amanda", "amber", "amelia", "amy", "andrea", "andrew", "angela",
    "anna", "anne", "anthony", "antony", "arthur", "ashley", "barbara", "barry", "ben", "benjamin",
    "beth", "bethany", "bill", "bob", "brandon", "brendan", "brian", "bruce", "callum", "cameron",
    "carl", "carol", "caroline", "catherine", "charles", "charlie", "charlotte", "chloe", "chris",
    "christine", "christopher", "claire", "colin", "connor", "craig", "daniel", "danny", "darren",
    "dave", "david", "dawn", "dean", "deborah", "declan", "denise", "dennis", "derek", "diane",
    "dominic", "donald", "donna", "dylan", "eddie", "edward", "elaine", "eleanor", "elizabeth",
    "ella", "ellie", "emily", "emma", "eric", "ethan", "fiona", "frances", "frank", "frederick",
    "gareth", "gary", "gavin", "gemma", "geoffrey", "george", "gerald", "gillian", "glen", "gordon",
    "graham", "grace", "gregory", "hannah", "harriet", "harry", "hayley", "heather", "helen",
    "henry", "holly", "ian", "imran", "isabel", "jack", "jacob", "jake", "james", "jamie", "jane",
    "janet", "jason", "jean", "jeffrey", "jennifer", "jenny", "jeremy", "jessica", "jill", "jim",
    "joan", "joanne", "joe", "joel", "john", "jonathan", "jordan", "joseph", "joshua", "joy",
    "judith", "julia", "julie", "justin", "karen", "kate", "katherine", "kathryn", "katie", "keith",
    "kelly", "kenneth", "kevin", "kieran", "kim", "kirsty", "laura", "lauren", "lee", "leo", "leon",
    "lewis", "liam", "linda", "lisa", "louise", "lucy", "luke", "lynn", "malcolm", "mandy", "marcus",
    "margaret", "maria", "marie", "mark", "martin", "mary", "matthew", "megan", "melanie",
    "michael", "michelle", "mike", "mohammed", "muhammad", "natalie", "nathan", "neil", "nicholas",
    "nick", "nicola", "nigel", "oliver", "olivia", "oscar", "owen", "pamela", "patricia", "patrick",
    "paul", "pauline", "peter", "philip", "phillip", "rachel", "rebecca", "richard", "rob", "robert",
    "robin", "roger", "ronald", "rosemary", "ross", "roy", "russell", "ruth", "ryan", "sally", "sam",
    "samantha", "samuel", "sandra", "sarah", "scott", "sean", "shaun", "sharon", "sheila", "simon",
    "sophie", "stephanie", "stephen", "steve", "steven", "stuart", "susan", "suzanne", "tanya",
    "teresa", "terry", "thomas", "tim", "timothy", "tina", "toby", "tom", "tony", "tracey", "tracy",
    "trevor", "valerie", "vanessa", "victoria", "vincent", "wayne", "william", "yvonne", "zoe",
];

const SURNAMES: &[&str] = &[
    "adams", "ahmed", "ali", "allen", "anderson", "andrews", "armstrong", "atkinson", "bailey",
    "baker", "ball", "barker", "barnes", "barrett", "bates", "begum", "bell", "bennett", "berry",
    "booth", "bradley", "brooks", "brown", "burns", "burton", "butler", "byrne", "campbell",
    "carr", "carter", "chapman", "clark", "clarke", "cole", "collins", "cook", "cooper", "cox",
    "cunningham", "davies", "davis", "dawson", "dixon", "doyle", "duncan", "edwards", "elliott",
    "ellis", "evans", "farrell", "fisher", "fletcher", "foster", "fox", "francis", "fraser",
    "gibson", "gill", "graham", "grant", "gray", "green", "gregory", "griffiths", "hall",
    "hamilton", "harris", "harrison", "hart", "harvey", "hayes", "henderson", "hill", "holmes",
    "hopkins", "howard", "hudson", "hughes", "hunt", "hunter", "hussain", "jackson", "james",
    "jenkins", "johnson", "johnston", "jones", "kaur", "kelly", "kennedy", "kerr", "khan", "king",
    "knight", "lawrence", "lee", "lewis", "lloyd", "lowe", "macdonald", "mackenzie", "macleod",
    "marsh", "marshall", "martin", "mason", "matthews", "mcdonald", "mcintyre", "mckenzie",
    "mclean", "mcmanus", "miller", "mills", "mitchell", "moore", "morgan", "morris", "murphy",
    "murray", "newman", "o'brien", "o'connor", "o'neill", "owen", "palmer", "parker", "patel",
    "paterson", "payne", "pearce", "pearson", "perry", "phillips", "powell", "price", "reed",
    "rees", "reid", "reynolds", "richards", "richardson", "riley", "roberts", "robertson",
    "robinson", "rogers", "ross", "russell", "ryan", "saunders", "scott", "shaw", "simpson",
    "singh", "smith", "spencer", "stevens", "stewart", "sullivan", "taylor", "thomas", "thompson",
    "thomson", "turner", "walker", "walsh", "ward", "watson", "watts", "webb", "webster", "wells",
    "white", "wilkinson", "williams", "wilson", "wood", "woods", "wright", "young",
];

const NICKNAMES: &[(&str, &str)] = &[
    ("jim", "james"), ("jimmy", "james"), ("bob", "robert"), ("bobby", "robert"), ("rob", "robert"),
    ("robbie", "robert"), ("bill", "william"), ("billy", "william"), ("will", "william"),
    ("mike", "michael"), ("mick", "michael"), ("dave", "david"), ("tom", "thomas"),
    ("tommy", "thomas"), ("andy", "andrew"), ("drew", "andrew"), ("tony", "anthony"),
    ("steve", "stephen"), ("chris", "christopher"), ("dan", "daniel"), ("danny", "daniel"),
    ("joe", "joseph"), ("matt", "matthew"), ("nick", "nicholas"), ("pete", "peter"),
    ("rick", "richard"), ("rich", "richard"), ("ben", "benjamin"), ("sam", "samuel"),
    ("alex", "alexander"), ("liz", "elizabeth"), ("beth", "elizabeth"), ("kate", "katherine"),
    ("katie", "katherine"), ("sue", "susan"), ("jenny", "jennifer"), ("maggie", "margaret"),
    ("pat", "patrick"), ("ed", "edward"), ("eddie", "edward"), ("ted", "edward"),
    ("charlie", "charles"), ("fred", "frederick"), ("ken", "kenneth"), ("ron", "ronald"),
    ("greg", "gregory"), ("phil", "philip"), ("tim", "timothy"), ("jon", "john"),
];

const SERVICE_TERMS: &[&str] = &[
    "about", "account", "address", "air", "apply", "approved", "areas", "award", "bathroom",
    "bathrooms", "blog", "boiler", "boilers", "book", "booking", "builders", "building",
    "business", "call", "careers", "cart", "central", "certified", "checkout", "cleaning", "click",
    "commercial", "company", "conditioning", "conditions", "construction", "contact", "cookie",
    "cookies", "copyright", "covered", "customer", "customers", "design", "directions", "domestic",
    "doors", "drainage", "electrical", "electrician", "email", "emergency", "energy", "enquiries",
    "enquiry", "estimate", "facebook", "faq", "faqs", "fax", "finance", "flooring", "follow",
    "free", "gallery", "garden", "gardens", "gas", "get", "google", "guarantee", "guaranteed",
    "heat", "heating", "help", "here", "home", "hours", "installation", "installations",
    "instagram", "insurance", "jobs", "kitchen", "kitchens", "landscaping", "learn", "linkedin",
    "local", "location", "locations", "login", "maintenance", "map", "meet", "menu", "message", "mobile",
    "more", "news", "newsletter", "now", "offers", "online", "opening", "our", "phone", "plumber",
    "plumbers", "plumbing", "policy", "portfolio", "prices", "pricing", "privacy", "professional",
    "projects", "pump", "pumps", "quote", "quotes", "read", "registered", "renovation", "repair",
    "repairs", "reserved", "residential", "review", "reviews", "rights", "roofing", "safe",
    "sale", "search", "send", "service", "services", "shop", "sign", "solar", "solutions",
    "special", "started", "submit", "subscribe", "support", "systems", "team", "tel", "terms",
    "testimonials", "today", "trusted", "twitter", "us", "vacancies", "view", "welcome", "why",
    "windows", "youtube", "street", "road", "lane", "avenue", "drive", "close", "park", "house",
    "court", "centre", "center", "estate", "industrial", "unit", "floor", "office", "offices",
    "monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday", "january",
    "february", "march", "september", "october", "november", "december",
];

const SERVICE_PHRASES: &[&str] = &[
    "call now", "opening hours", "emergency plumbing", "read more", "find out more",
    "get in touch", "contact us", "about us", "free quote", "book now", "terms and conditions",
    "privacy policy", "all rights reserved", "gas safe", "customer service", "click here",
    "learn more", "meet the team", "social media", "request a callback",
];

const PLACE_NAMES: &[&str] = &[
    "london", "birmingham", "manchester", "leeds", "liverpool", "bristol", "sheffield",
    "newcastle", "nottingham", "leicester", "coventry", "bradford", "cardiff", "edinburgh",
    "glasgow", "belfast", "aberdeen", "dundee", "swansea", "southampton", "portsmouth",
    "plymouth", "brighton", "oxford", "cambridge", "york", "derby", "wolverhampton", "stoke",
    "sunderland", "northampton", "norwich", "exeter", "gloucester", "worcester", "hereford",
    "shrewsbury", "telford", "solihull", "walsall", "dudley", "sandwell", "midlands", "yorkshire",
    "lancashire", "cheshire", "kent", "surrey", "essex", "sussex", "devon", "cornwall", "dorset",
    "somerset", "wiltshire", "hampshire", "berkshire", "oxfordshire", "warwickshire",
    "staffordshire", "shropshire", "derbyshire", "nottinghamshire", "lincolnshire", "norfolk",
    "suffolk", "cumbria", "northumberland", "scotland", "wales", "england", "ireland", "britain",
    "uk", "kingdom", "harborne", "edgbaston", "moseley", "erdington", "sutton", "coldfield",
];

// * Non-name words that commonly sit inside capitalized runs
const BLACKLIST: &[&str] = &[
    "the", "and", "of", "for", "with", "your", "you", "we", "a", "an", "in", "on", "at", "to",
    "by", "from", "ltd", "limited", "llp", "plc", "inc", "llc", "group", "director", "directors",
    "managing", "manager", "owner", "founder", "ceo", "chairman", "partner", "partners", "head",
    "chief", "officer", "executive", "lead", "engineer", "engineers", "secretary", "mr", "mrs",
    "ms", "miss", "dr", "prof", "sir", "dame", "rev",
];

const HONORIFICS: &[&str] = &["mr", "mrs", "ms", "miss", "mx", "dr", "prof", "sir", "dame", "rev"];

const TESTIMONIAL_MARKERS: &[&str] = &[
    "review", "reviews", "reviewed", "testimonial", "testimonials", "recommend", "recommended",
    "highly", "thank", "thanks", "brilliant", "fantastic", "excellent", "stars", "★", "verified",
    "checkatrade", "trustpilot", "rated", "customer", "client",
];

const SIGN_OFFS: &[&str] = &[
    "regards", "kind regards", "best regards", "many thanks", "sincerely", "yours faithfully",
    "yours sincerely", "best wishes", "cheers", "thanks",
];

const CONTACT_LABELS: &[&str] = &[
    "email", "e-mail", "e", "tel", "telephone", "phone", "t", "mobile", "mob", "m", "call", "on",
    "at", "via", "linkedin", "contact", "direct", "dd", "office", "or",
];

// * Ranked: earlier phrases win ties at equal distance
const TITLE_PHRASES: &[(&str, &str, SeniorityTier)] = &[
    ("managing director", "Managing Director", SeniorityTier::Tier1),
    ("chief executive officer", "CEO", SeniorityTier::Tier1),
    ("chief executive", "CEO", SeniorityTier::Tier1),
    ("ceo", "CEO", SeniorityTier::Tier1),
    ("co-founder", "Co-Founder", SeniorityTier::Tier1),
    ("founder", "Founder", SeniorityTier::Tier1),
    ("owner", "Owner", SeniorityTier::Tier1),
    ("proprietor", "Proprietor", SeniorityTier::Tier1),
    ("principal", "Principal", SeniorityTier::Tier1),
    ("chairman", "Chairman", SeniorityTier::Tier1),
    ("chairwoman", "Chairwoman", SeniorityTier::Tier1),
    ("president", "President", SeniorityTier::Tier1),
    ("designated member", "Designated Member", SeniorityTier::Tier1),
    ("md", "Managing Director", SeniorityTier::Tier1),
    ("vice president", "Vice President", SeniorityTier::Tier2),
    ("general manager", "General Manager", SeniorityTier::Tier2),
    ("operations director", "Operations Director", SeniorityTier::Tier2),
    ("finance director", "Finance Director", SeniorityTier::Tier2),
    ("technical director", "Technical Director", SeniorityTier::Tier2),
    ("director", "Director", SeniorityTier::Tier2),
    ("partner", "Partner", SeniorityTier::Tier2),
    ("cto", "CTO", SeniorityTier::Tier2),
    ("cfo", "CFO", SeniorityTier::Tier2),
    ("coo", "COO", SeniorityTier::Tier2),
    ("vp", "Vice President", SeniorityTier::Tier2),
    ("company secretary", "Company Secretary", SeniorityTier::Tier3),
    ("office manager", "Office Manager", SeniorityTier::Tier3),
    ("manager", "Manager", SeniorityTier::Tier3),
    ("supervisor", "Supervisor", SeniorityTier::Tier3),
    ("team lead", "Team Lead", SeniorityTier::Tier3),
    ("lead", "Lead", SeniorityTier::Tier3),
    ("coordinator", "Coordinator", SeniorityTier::Tier3),
    ("secretary", "Secretary", SeniorityTier::Tier3),
];

/// A role phrase with its display form and seniority
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitlePhrase {
    /// Lowercase phrase, matched token-by-token
    pub phrase: String,
    pub display: String,
    pub tier: SeniorityTier,
}

impl TitlePhrase {
    pub fn tokens(&self) -> Vec<&str> {
        self.phrase.split_whitespace().collect()
    }
}

/// Additional entries merged into the built-in lexicon
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LexiconExtension {
    pub first_names: Vec<String>,
    pub surnames: Vec<String>,
    pub nicknames: BTreeMap<String, String>,
    pub service_terms: Vec<String>,
    pub service_phrases: Vec<String>,
    pub place_names: Vec<String>,
    pub blacklist: Vec<String>,
    pub title_phrases: Vec<TitlePhrase>,
}

/// Curated reference data shared read-only by every worker
#[derive(Debug, Clone, Default)]
pub struct Lexicon {
    first_names: HashSet<String>,
    surnames: HashSet<String>,
    nicknames: HashMap<String, String>,
    service_terms: HashSet<String>,
    service_phrases: Vec<String>,
    place_names: HashSet<String>,
    blacklist: HashSet<String>,
    honorifics: HashSet<String>,
    testimonial_markers: HashSet<String>,
    sign_offs: Vec<String>,
    contact_labels: HashSet<String>,
    title_phrases: Vec<TitlePhrase>,
}

fn owned_set(items: &[&str]) -> HashSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Lexicon {
    /// Built-in lists tuned for UK small-business websites
    pub fn builtin() -> Self {
        Self {
            first_names: owned_set(FIRST_NAMES),
            surnames: owned_set(SURNAMES),
            nicknames: NICKNAMES
                .iter()
                .map(|(nick, full)| (nick.to_string(), full.to_string()))
                .collect(),
            service_terms: owned_set(SERVICE_TERMS),
            service_phrases: SERVICE_PHRASES.iter().map(|s| s.to_string()).collect(),
            place_names: owned_set(PLACE_NAMES),
            blacklist: owned_set(BLACKLIST),
            honorifics: owned_set(HONORIFICS),
            testimonial_markers: owned_set(TESTIMONIAL_MARKERS),
            sign_offs: SIGN_OFFS.iter().map(|s| s.to_string()).collect(),
            contact_labels: owned_set(CONTACT_LABELS),
            title_phrases: TITLE_PHRASES
                .iter()
                .map(|(phrase, display, tier)| TitlePhrase {
                    phrase: phrase.to_string(),
                    display: display.to_string(),
                    tier: *tier,
                })
                .collect(),
        }
    }

    /// Minimal lexicon built from explicit lists, for fixtures
    pub fn from_lists(first_names: &[&str], surnames: &[&str], service_terms: &[&str]) -> Self {
        let builtin = Self::builtin();
        Self {
            first_names: owned_set(first_names),
            surnames: owned_set(surnames),
            service_terms: owned_set(service_terms),
            service_phrases: Vec::new(),
            place_names: HashSet::new(),
            nicknames: builtin.nicknames,
            blacklist: builtin.blacklist,
            honorifics: builtin.honorifics,
            testimonial_markers: builtin.testimonial_markers,
            sign_offs: builtin.sign_offs,
            contact_labels: builtin.contact_labels,
            title_phrases: builtin.title_phrases,
        }
    }

    /// Merges an extension document into this lexicon (load time only)
    pub fn extend(&mut self, extension: LexiconExtension) {
        let lower = |v: Vec<String>| v.into_iter().map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty());

        self.first_names.extend(lower(extension.first_names));
        self.surnames.extend(lower(extension.surnames));
        self.service_terms.extend(lower(extension.service_terms));
        self.service_phrases.extend(lower(extension.service_phrases));
        self.place_names.extend(lower(extension.place_names));
        self.blacklist.extend(lower(extension.blacklist));
        for (nick, full) in extension.nicknames {
            self.nicknames.insert(nick.to_lowercase(), full.to_lowercase());
        }

        // * Custom titles rank ahead of built-ins so they win ties
        if !extension.title_phrases.is_empty() {
            let mut phrases: Vec<TitlePhrase> = extension
                .title_phrases
                .into_iter()
                .map(|mut t| {
                    t.phrase = t.phrase.to_lowercase();
                    t
                })
                .collect();
            phrases.append(&mut self.title_phrases);
            self.title_phrases = phrases;
        }
    }

    pub fn extend_from_json(&mut self, json: &str) -> Result<(), LexiconError> {
        let extension: LexiconExtension = serde_json::from_str(json)?;
        self.extend(extension);
        Ok(())
    }

    /// Built-in lexicon plus the extension file at `path`
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LexiconError> {
        let raw = std::fs::read_to_string(path)?;
        let mut lexicon = Self::builtin();
        lexicon.extend_from_json(&raw)?;
        tracing::info!(
            first_names = lexicon.first_names.len(),
            surnames = lexicon.surnames.len(),
            service_terms = lexicon.service_terms.len(),
            "Lexicon loaded"
        );
        Ok(lexicon)
    }

    pub fn is_first_name(&self, token: &str) -> bool {
        let lower = token.to_lowercase();
        self.first_names.contains(&lower) || self.nicknames.contains_key(&lower)
    }

    pub fn is_surname(&self, token: &str) -> bool {
        self.surnames.contains(&token.to_lowercase())
    }

    pub fn in_reference(&self, token: &str) -> bool {
        self.is_first_name(token) || self.is_surname(token)
    }

    pub fn is_service_term(&self, token: &str) -> bool {
        self.service_terms.contains(&token.to_lowercase())
    }

    pub fn service_terms(&self) -> impl Iterator<Item = &str> {
        self.service_terms.iter().map(String::as_str)
    }

    pub fn service_phrases(&self) -> impl Iterator<Item = &str> {
        self.service_phrases.iter().map(String::as_str)
    }

    /// Returns the first multi-word service phrase found in `text`
    pub fn service_phrase_in(&self, text: &str) -> Option<&str> {
        let normalized = format!(" {} ", text.to_lowercase().split_whitespace().collect::<Vec<_>>().join(" "));
        self.service_phrases
            .iter()
            .find(|p| normalized.contains(&format!(" {} ", p)))
            .map(|p| p.as_str())
    }

    pub fn is_place(&self, token: &str) -> bool {
        self.place_names.contains(&token.to_lowercase())
    }

    pub fn is_blacklisted(&self, token: &str) -> bool {
        self.blacklist.contains(&token.to_lowercase().trim_end_matches('.').to_string())
    }

    pub fn is_honorific(&self, token: &str) -> bool {
        self.honorifics.contains(&token.to_lowercase().trim_end_matches('.').to_string())
    }

    /// Full form of a nickname, if the token is one
    pub fn expand_nickname(&self, token: &str) -> Option<&str> {
        self.nicknames.get(&token.to_lowercase()).map(|s| s.as_str())
    }

    pub fn is_testimonial_marker(&self, token: &str) -> bool {
        self.testimonial_markers.contains(&token.to_lowercase())
    }

    /// True when the text ends with a sign-off such as "Kind regards,"
    pub fn ends_with_sign_off(&self, text: &str) -> bool {
        let lower = text
            .to_lowercase()
            .trim_end_matches(|c: char| c.is_whitespace() || c == ',' || c == '-')
            .to_string();
        self.sign_offs.iter().any(|s| lower.ends_with(s.as_str()))
    }

    pub fn is_contact_label(&self, token: &str) -> bool {
        self.contact_labels.contains(&token.to_lowercase())
    }

    pub fn title_phrases(&self) -> &[TitlePhrase] {
        &self.title_phrases
    }

    /// True when a word belongs to any title phrase
    pub fn is_title_word(&self, token: &str) -> bool {
        let lower = token.to_lowercase();
        self.title_phrases.iter().any(|t| t.tokens().contains(&lower.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_reference_lists() {
        let lexicon = Lexicon::builtin();
        assert!(lexicon.is_first_name("Andrew"));
        assert!(lexicon.is_surname("RILEY"));
        assert!(lexicon.is_surname("McManus"));
        assert!(lexicon.in_reference("Jim"));
        assert!(!lexicon.in_reference("Plumbing"));
    }

    #[test]
    fn test_service_phrase_detection() {
        let lexicon = Lexicon::builtin();
        assert_eq!(lexicon.service_phrase_in("Call  Now"), Some("call now"));
        assert_eq!(lexicon.service_phrase_in("Andrew Riley"), None);
    }

    #[test]
    fn test_nickname_expansion() {
        let lexicon = Lexicon::builtin();
        assert_eq!(lexicon.expand_nickname("Jim"), Some("james"));
        assert_eq!(lexicon.expand_nickname("James"), None);
    }

    #[test]
    fn test_extend_from_json() {
        let mut lexicon = Lexicon::builtin();
        lexicon
            .extend_from_json(
                r#"{
                    "first_names": ["Ffion"],
                    "surnames": ["Gruffydd"],
                    "service_terms": ["Boilercare"],
                    "title_phrases": [{ "phrase": "Head Gardener", "display": "Head Gardener", "tier": "tier_3" }]
                }"#,
            )
            .unwrap();

        assert!(lexicon.is_first_name("ffion"));
        assert!(lexicon.is_surname("Gruffydd"));
        assert!(lexicon.is_service_term("boilercare"));
        assert_eq!(lexicon.title_phrases()[0].phrase, "head gardener");
    }

    #[test]
    fn test_sign_off_detection() {
        let lexicon = Lexicon::builtin();
        assert!(lexicon.ends_with_sign_off("Thanks again for your help.\nKind regards,\n"));
        assert!(!lexicon.ends_with_sign_off("Our engineers cover the region"));
    }

    #[test]
    fn test_title_words() {
        let lexicon = Lexicon::builtin();
        assert!(lexicon.is_title_word("Director"));
        assert!(!lexicon.is_title_word("Andrew"));
    }
}
