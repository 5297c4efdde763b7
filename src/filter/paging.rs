use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub page: usize,
    pub total_pages: usize,
    pub page_size: usize,
    pub total_items: usize,
}

/// Clamps the requested page into `[1, total_pages]`; an empty list still has one page.
pub fn clamp_page(requested: usize, total_items: usize, page_size: usize) -> PageInfo {
    let page_size = page_size.max(1);
    let total_pages = total_items.div_ceil(page_size).max(1);
    PageInfo {
        page: requested.clamp(1, total_pages),
        total_pages,
        page_size,
        total_items,
    }
}

pub fn page_slice<'a, T>(items: &'a [T], info: &PageInfo) -> &'a [T] {
    let start = ((info.page - 1) * info.page_size).min(items.len());
    let end = (start + info.page_size).min(items.len());
    &items[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_page_empty_list() {
        let info = clamp_page(3, 0, 30);
        assert_eq!(info.page, 1);
        assert_eq!(info.total_pages, 1);
    }

    #[test]
    fn test_clamp_page_beyond_last() {
        let info = clamp_page(9, 61, 30);
        assert_eq!(info.total_pages, 3);
        assert_eq!(info.page, 3);
    }

    #[test]
    fn test_clamp_page_zero_becomes_first() {
        assert_eq!(clamp_page(0, 10, 30).page, 1);
    }

    #[test]
    fn test_page_slice() {
        let items: Vec<u32> = (1..=65).collect();
        let info = clamp_page(3, items.len(), 30);
        assert_eq!(page_slice(&items, &info), &[61, 62, 63, 64, 65]);

        let info = clamp_page(1, items.len(), 30);
        assert_eq!(page_slice(&items, &info).len(), 30);
    }

    #[test]
    fn test_zero_page_size_is_treated_as_one() {
        let info = clamp_page(2, 3, 0);
        assert_eq!(info.page_size, 1);
        assert_eq!(info.total_pages, 3);
        assert_eq!(info.page, 2);
    }
}
