use url::Url;

const DEFAULT_LOCATION: &str = "formwright://local/wizard";

/// Page URL whose query parameter names the current step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLocation {
    url: Url,
    param: String,
}

impl PageLocation {
    pub fn new(url: Url, param: impl Into<String>) -> Self {
        Self { url, param: param.into() }
    }

    pub fn parse(url: &str, param: impl Into<String>) -> Result<Self, url::ParseError> {
        Ok(Self::new(Url::parse(url)?, param))
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn param(&self) -> &str {
        &self.param
    }

    /// Step id carried by the query, if any.
    pub fn step_id(&self) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(key, value)| key == self.param.as_str() && !value.is_empty())
            .map(|(_, value)| value.into_owned())
    }

    /// Rewrites the step parameter, keeping every other pair in order.
    pub fn set_step(&mut self, step_id: &str) {
        let mut pairs: Vec<(String, String)> = self
            .url
            .query_pairs()
            .filter(|(key, _)| key != self.param.as_str())
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        pairs.push((self.param.clone(), step_id.to_string()));
        self.url.query_pairs_mut().clear().extend_pairs(pairs);
    }

    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.url
            .query_pairs()
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect()
    }

    /// Replaces the URL, keeping the parameter name.
    pub fn replace_url(&mut self, url: Url) {
        self.url = url;
    }
}

impl Default for PageLocation {
    fn default() -> Self {
        Self::parse(DEFAULT_LOCATION, "step").expect("default location parses")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_and_rewrites_the_step_parameter() {
        let mut location = PageLocation::parse("https://app.example.com/modules/new?project=demo&step=module", "step").expect("url");
        assert_eq!(location.step_id().as_deref(), Some("module"));

        location.set_step("resources");
        assert_eq!(location.step_id().as_deref(), Some("resources"));
        assert_eq!(location.url().as_str(), "https://app.example.com/modules/new?project=demo&step=resources");
        assert_eq!(
            location.query_pairs(),
            vec![("project".to_string(), "demo".to_string()), ("step".to_string(), "resources".to_string())]
        );
    }

    #[test]
    fn missing_parameter_reads_as_none() {
        let location = PageLocation::default();
        assert_eq!(location.step_id(), None);
        assert_eq!(location.param(), "step");
    }
}
