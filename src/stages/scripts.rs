//! Page-side functions evaluated inside render sessions.
//!
//! Each constant is the source of a JavaScript function. The session calls it
//! with JSON arguments spread as parameters. Functions only sample or mutate
//! the document; every decision about what to change is made in Rust.

/// `(selectors: string[]) -> number` removes every element matching any selector.
pub(crate) const REMOVE_MATCHING: &str = r#"(selectors) => {
  let removed = 0;
  for (const selector of selectors) {
    for (const el of document.querySelectorAll(selector)) {
      el.remove();
      removed++;
    }
  }
  return removed;
}"#;

/// `() -> { viewport, images[] }` samples sizing data for every image.
pub(crate) const SAMPLE_IMAGES: &str = r#"() => ({
  viewport: { width: window.innerWidth, height: window.innerHeight },
  images: Array.from(document.images).map((img) => {
    const rect = img.getBoundingClientRect();
    return {
      hasWidth: img.hasAttribute('width'),
      styleHeight: img.style.height || 'auto',
      naturalWidth: img.naturalWidth,
      naturalHeight: img.naturalHeight,
      left: rect.left,
      top: rect.top
    };
  })
})"#;

/// `(hints[]) -> number` applies sizing and lazy-loading hints by image index.
pub(crate) const APPLY_IMAGE_HINTS: &str = r#"(hints) => {
  const images = Array.from(document.images);
  let applied = 0;
  for (const hint of hints) {
    const img = images[hint.index];
    if (!img) {
      continue;
    }
    if (hint.size) {
      img.setAttribute('width', String(hint.size.width));
      img.setAttribute('height', String(hint.size.height));
      img.style.height = 'auto';
    }
    if (hint.lazy) {
      img.setAttribute('loading', 'lazy');
    }
    applied++;
  }
  return applied;
}"#;

pub(crate) const UNREGISTER_SERVICE_WORKERS: &str = r#"async () => {
  if (!('serviceWorker' in navigator)) {
    return 0;
  }
  const registrations = await navigator.serviceWorker.getRegistrations();
  await Promise.all(registrations.map((registration) => registration.unregister()));
  return registrations.length;
}"#;

/// `() -> state[]` for every element under `body`, in document order.
pub(crate) const SAMPLE_VISUAL_STATE: &str = r#"() => {
  const root = document.body;
  if (!root) {
    return [];
  }
  return Array.from(root.querySelectorAll('*')).map((el) => {
    const rect = el.getBoundingClientRect();
    const style = window.getComputedStyle(el);
    return {
      tag: el.localName,
      width: rect.width,
      height: rect.height,
      opacity: style.opacity,
      visibility: style.visibility,
      overflow: style.overflow,
      display: style.display
    };
  });
}"#;

/// `(indices: number[]) -> number` removes body elements by sampling index.
pub(crate) const REMOVE_BODY_ELEMENTS: &str = r#"(indices) => {
  const root = document.body;
  const elements = root ? Array.from(root.querySelectorAll('*')) : [];
  let removed = 0;
  for (const index of indices) {
    const el = elements[index];
    if (el) {
      el.remove();
      removed++;
    }
  }
  return removed;
}"#;

/// `(selector) -> source[]` lists inline style text and stylesheet link targets.
pub(crate) const SAMPLE_STYLE_SOURCES: &str = r#"(selector) =>
  Array.from(document.querySelectorAll(selector)).map((el) =>
    el.localName === 'link'
      ? { kind: 'link', href: el.href }
      : { kind: 'inline', text: el.textContent || '' })"#;

/// `(selector, texts: (string|null)[]) -> number` replaces style text and
/// swaps stylesheet links for inline styles. `null` leaves an element alone.
pub(crate) const APPLY_STYLE_SOURCES: &str = r#"(selector, texts) => {
  const elements = Array.from(document.querySelectorAll(selector));
  let applied = 0;
  elements.forEach((el, index) => {
    const text = texts[index];
    if (text === null || text === undefined) {
      return;
    }
    if (el.localName === 'link') {
      const style = document.createElement('style');
      const media = el.getAttribute('media');
      if (media) {
        style.setAttribute('media', media);
      }
      style.textContent = text;
      el.replaceWith(style);
    } else {
      el.textContent = text;
    }
    applied++;
  });
  return applied;
}"#;

/// Reassigning `src` stores the resolved absolute URL in the attribute.
pub(crate) const REFRESH_IMAGE_SOURCES: &str = r#"() => {
  let refreshed = 0;
  for (const img of document.images) {
    if (img.hasAttribute('src')) {
      img.src = img.src;
      refreshed++;
    }
  }
  return refreshed;
}"#;

/// `(name) -> string[]` values of attribute `name`, in document order.
pub(crate) const SAMPLE_ATTRIBUTE: &str = r#"(name) =>
  Array.from(document.querySelectorAll(`[${name}]`)).map((el) => el.getAttribute(name))"#;

/// `(name, updates: {index, value}[]) -> number` sets attribute values by
/// the index `SAMPLE_ATTRIBUTE` reported.
pub(crate) const SET_ATTRIBUTE: &str = r#"(name, updates) => {
  const elements = Array.from(document.querySelectorAll(`[${name}]`));
  let updated = 0;
  for (const update of updates) {
    const el = elements[update.index];
    if (el) {
      el.setAttribute(name, update.value);
      updated++;
    }
  }
  return updated;
}"#;

/// `() -> {tag, name}[]` distinct element/attribute pairs in the document.
pub(crate) const COLLECT_ATTRIBUTE_NAMES: &str = r#"() => {
  const seen = new Set();
  const pairs = [];
  for (const el of document.querySelectorAll('*')) {
    for (const name of el.getAttributeNames()) {
      const key = `${el.localName} ${name}`;
      if (!seen.has(key)) {
        seen.add(key);
        pairs.push({ tag: el.localName, name });
      }
    }
  }
  return pairs;
}"#;

/// `(pairs: {tag, name}[]) -> number` removes the listed attributes.
pub(crate) const STRIP_ATTRIBUTES: &str = r#"(pairs) => {
  const strip = new Set(pairs.map((pair) => `${pair.tag} ${pair.name}`));
  let removed = 0;
  for (const el of document.querySelectorAll('*')) {
    for (const name of el.getAttributeNames()) {
      if (strip.has(`${el.localName} ${name}`)) {
        el.removeAttribute(name);
        removed++;
      }
    }
  }
  return removed;
}"#;

/// `() -> (rule[]|null)[]` the rule tree of every `<style>` element. `null`
/// marks a sheet the page would not expose.
pub(crate) const EXTRACT_RULES: &str = r#"() => {
  const groupTypes = ['CSSMediaRule', 'CSSSupportsRule', 'CSSLayerBlockRule', 'CSSContainerRule']
    .map((name) => window[name])
    .filter(Boolean);
  const describe = (rule) => {
    if (rule instanceof CSSStyleRule) {
      return { kind: 'style', selector: rule.selectorText, text: rule.cssText };
    }
    if (rule instanceof CSSImportRule) {
      return { kind: 'import', text: rule.cssText };
    }
    if (groupTypes.some((type) => rule instanceof type)) {
      const text = rule.cssText;
      return {
        kind: 'group',
        prelude: text.slice(0, text.indexOf('{')).trim(),
        children: Array.from(rule.cssRules).map(describe)
      };
    }
    return { kind: 'other', text: rule.cssText };
  };
  return Array.from(document.querySelectorAll('style')).map((style) => {
    try {
      return style.sheet ? Array.from(style.sheet.cssRules).map(describe) : null;
    } catch (_) {
      return null;
    }
  });
}"#;

/// `(selectors: string[]) -> {[selector]: boolean|null}`; `null` when the
/// document rejects the selector.
pub(crate) const PROBE_SELECTORS: &str = r#"(selectors) => {
  const result = {};
  for (const selector of selectors) {
    try {
      result[selector] = document.querySelector(selector) !== null;
    } catch (_) {
      result[selector] = null;
    }
  }
  return result;
}"#;

/// `(updates: {index, text|null}[]) -> number` rewrites `<style>` text by
/// index; `null` removes the element.
pub(crate) const APPLY_SHEETS: &str = r#"(updates) => {
  const styles = Array.from(document.querySelectorAll('style'));
  let applied = 0;
  for (const update of updates) {
    const style = styles[update.index];
    if (!style) {
      continue;
    }
    if (update.text === null) {
      style.remove();
    } else {
      style.textContent = update.text;
    }
    applied++;
  }
  return applied;
}"#;
