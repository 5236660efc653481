use crate::report::model::Label;

/// Grouping labels the external renderer uses to build its tree.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Classification {
    pub test_class: String,
    pub package: String,
    pub suite: String,
}

impl Classification {
    /// Best-effort guess from the display name. Plain substring checks, so a
    /// name that merely contains "ui" is classified as a UI test.
    pub fn detect(test_name: &str) -> Self {
        let name = test_name.to_lowercase();
        let (test_class, package, suite) = if name.contains("apollo") {
            ("TestApollo", "tests.api.test_apollo", "Apollo API Tests")
        } else if name.contains("ui") || name.contains("browser") {
            ("UITest", "tests.ui", "UI Tests")
        } else if name.contains("api") {
            ("APITest", "tests.api", "API Tests")
        } else {
            ("TestSuite", "tests", "Test Suite")
        };
        Classification {
            test_class: test_class.to_string(),
            package: package.to_string(),
            suite: suite.to_string(),
        }
    }

    /// Detected values with any explicit overrides applied.
    pub fn resolve(
        test_name: &str,
        test_class: Option<&str>,
        package: Option<&str>,
        suite: Option<&str>,
    ) -> Self {
        let detected = Classification::detect(test_name);
        Classification {
            test_class: non_empty(test_class).unwrap_or(detected.test_class),
            package: non_empty(package).unwrap_or(detected.package),
            suite: non_empty(suite).unwrap_or(detected.suite),
        }
    }

    pub fn to_labels(&self, test_method: &str) -> Vec<Label> {
        vec![
            Label::new("testClass", &self.test_class),
            Label::new("testMethod", test_method),
            Label::new("package", &self.package),
            Label::new("suite", &self.suite),
        ]
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty()).map(str::to_string)
}
