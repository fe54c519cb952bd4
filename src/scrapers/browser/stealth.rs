//! Automation-masking scripts run in the listing page before the in-page
//! API call. Each snippet is self-contained and swallows its own errors.

pub const STEALTH_SCRIPTS: &[&str] = &[
    // navigator.webdriver is the first thing bot checks read
    r#"
    try {
        Object.defineProperty(Navigator.prototype, 'webdriver', {
            get: () => undefined,
            configurable: true
        });
    } catch (e) {}
    "#,
    r#"
    try {
        if (!window.chrome) {
            window.chrome = { runtime: {}, app: {}, csi: function() {}, loadTimes: function() {} };
        }
    } catch (e) {}
    "#,
    r#"
    try {
        Object.defineProperty(navigator, 'languages', {
            get: () => ['en-GB', 'en-US', 'en'],
            configurable: true
        });
    } catch (e) {}
    "#,
    // Headless Chrome reports an empty plugin list
    r#"
    try {
        Object.defineProperty(navigator, 'plugins', {
            get: () => [
                { name: 'PDF Viewer', filename: 'internal-pdf-viewer', description: 'Portable Document Format' },
                { name: 'Chrome PDF Viewer', filename: 'internal-pdf-viewer', description: 'Portable Document Format' }
            ],
            configurable: true
        });
    } catch (e) {}
    "#,
];
