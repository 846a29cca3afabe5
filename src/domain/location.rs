use std::fmt;

/// The refuges tracked on the booking site. Declaration order is display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Location {
    TeteRousse,
    Gouter,
}

impl Location {
    pub const ALL: [Location; 2] = [Location::TeteRousse, Location::Gouter];

    pub fn name(&self) -> &'static str {
        match self {
            Location::TeteRousse => "Tête Rousse",
            Location::Gouter => "du Goûter",
        }
    }

    /// Structure identifier used by the upstream booking API.
    pub fn structure_id(&self) -> &'static str {
        match self {
            Location::TeteRousse => "BK_STRUCTURE:29",
            Location::Gouter => "BK_STRUCTURE:30",
        }
    }

    pub fn parse(name: &str) -> Result<Location, String> {
        let name = name.trim();
        Location::ALL
            .into_iter()
            .find(|location| location.name() == name)
            .ok_or_else(|| format!("'{}' is not a tracked refuge.", name))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Location part of a saved query: `*` or a single refuge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocationFilter {
    #[default]
    Any,
    Only(Location),
}

impl LocationFilter {
    pub const WILDCARD: &'static str = "*";

    pub fn parse(s: &str) -> Result<LocationFilter, String> {
        match s.trim() {
            "" | Self::WILDCARD => Ok(LocationFilter::Any),
            name => Location::parse(name).map(LocationFilter::Only),
        }
    }

    pub fn matches(&self, location: Location) -> bool {
        match self {
            LocationFilter::Any => true,
            LocationFilter::Only(only) => *only == location,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LocationFilter::Any => Self::WILDCARD,
            LocationFilter::Only(location) => location.name(),
        }
    }
}
